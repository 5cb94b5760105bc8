//! Professional-community classification from skill sets
//!
//! A pure, deterministic mapping from a person's skills to weighted
//! community tags. The table is hand-curated; membership is computed fresh
//! on every query from the current HAS_SKILL edges, never stored.

use std::collections::HashMap;

/// Default membership threshold: communities scoring at least this fraction
/// of the best-matching community are reported.
pub const MEMBERSHIP_THRESHOLD: f64 = 0.3;

/// The closed set of community tags
pub const COMMUNITY_TAGS: &[&str] = &[
    "backend", "frontend", "mobile", "devops", "data", "ml-ai", "qa-test", "analyst", "general",
];

/// Key skills per community. A skill counts for a community when it matches
/// any key skill by case-insensitive substring containment in either
/// direction.
const COMMUNITY_KEY_SKILLS: &[(&str, &[&str])] = &[
    (
        "backend",
        &[
            "Java", "Python", "Go", "Node.js", "PHP", "Ruby", "C#", ".NET", "Spring", "Django",
            "FastAPI", "Express",
        ],
    ),
    (
        "frontend",
        &[
            "React", "Vue", "Angular", "JavaScript", "TypeScript", "HTML", "CSS", "Next.js",
            "Svelte",
        ],
    ),
    (
        "mobile",
        &["Swift", "Kotlin", "Flutter", "React Native", "iOS", "Android", "Xamarin"],
    ),
    (
        "devops",
        &[
            "Docker", "Kubernetes", "AWS", "Azure", "GCP", "Jenkins", "Terraform", "Ansible",
            "CI/CD",
        ],
    ),
    (
        "data",
        &[
            "SQL", "PostgreSQL", "MySQL", "MongoDB", "Redis", "Cassandra", "Spark", "Kafka",
            "Elasticsearch",
        ],
    ),
    (
        "ml-ai",
        &[
            "TensorFlow", "PyTorch", "Scikit-learn", "Machine Learning", "Deep Learning", "AI",
            "NLP", "Computer Vision",
        ],
    ),
    (
        "qa-test",
        &[
            "QA", "Testing", "Test Automation", "Selenium", "JUnit", "Jest", "Cypress", "Postman",
            "Quality Assurance", "Manual Testing", "Test Cases",
        ],
    ),
    (
        "analyst",
        &[
            "Business Analysis", "Data Analysis", "Analytics", "Tableau", "Power BI", "Excel",
            "Requirements Analysis", "Requirement Analysis", "BA", "Product Analysis",
            "Stakeholder", "Agile", "Jira",
        ],
    ),
];

/// A person's computed community membership
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityProfile {
    /// Best-matching community ("general" when nothing matches)
    pub primary: String,
    /// Every community at or above the threshold, strongest first
    pub communities: Vec<String>,
    /// Normalised score per matched community
    pub scores: HashMap<String, f64>,
}

impl CommunityProfile {
    fn general() -> Self {
        Self {
            primary: "general".into(),
            communities: vec!["general".into()],
            scores: HashMap::from([("general".to_string(), 1.0)]),
        }
    }
}

/// Classify a skill set into weighted communities.
///
/// Raw score per community is the number of distinct input skills matching
/// any of its key skills; scores are normalised by the maximum. Primary
/// selection between tied communities follows map-iteration order.
pub fn classify(skills: &[String], threshold: f64) -> CommunityProfile {
    let mut raw_scores: HashMap<&'static str, u32> = HashMap::new();

    for skill in skills {
        let skill_lower = skill.to_lowercase();
        if skill_lower.is_empty() {
            continue;
        }

        for &(community, key_skills) in COMMUNITY_KEY_SKILLS {
            for key_skill in key_skills {
                let key_lower = key_skill.to_lowercase();
                if skill_lower.contains(&key_lower) || key_lower.contains(&skill_lower) {
                    *raw_scores.entry(community).or_insert(0) += 1;
                    // Count each skill once per community
                    break;
                }
            }
        }
    }

    let max_score = raw_scores.values().copied().max().unwrap_or(0);
    if max_score == 0 {
        return CommunityProfile::general();
    }

    let mut primary = String::new();
    let mut scores = HashMap::with_capacity(raw_scores.len());
    let mut communities = Vec::new();

    for (&community, &raw) in &raw_scores {
        let normalised = f64::from(raw) / f64::from(max_score);
        scores.insert(community.to_string(), normalised);

        if raw == max_score && primary.is_empty() {
            primary = community.to_string();
        }
        if normalised >= threshold {
            communities.push((community.to_string(), normalised));
        }
    }

    communities.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    CommunityProfile {
        primary,
        communities: communities.into_iter().map(|(c, _)| c).collect(),
        scores,
    }
}

/// Infer communities a free-text query touches, as a soft hint.
///
/// Falls back to every tag for broad queries that name no key skill.
pub fn communities_for_query(query: &str) -> Vec<String> {
    let query_lower = query.to_lowercase();
    let mut matches = Vec::new();

    for &(community, key_skills) in COMMUNITY_KEY_SKILLS {
        if key_skills
            .iter()
            .any(|k| query_lower.contains(&k.to_lowercase()))
        {
            matches.push(community.to_string());
        }
    }

    if matches.is_empty() {
        return COMMUNITY_TAGS.iter().map(|t| (*t).to_string()).collect();
    }

    matches
}
