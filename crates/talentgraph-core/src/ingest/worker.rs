//! Background extraction worker
//!
//! A long-lived loop draining the bounded ingest queue. Each job runs the
//! LLM extraction, records provenance, writes nodes and edges through the
//! graph store, and queues the new nodes for embedding. Failures move the
//! job to `failed`; there is no retry.

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::embedding::EmbeddingQueue;
use crate::error::Result;
use crate::graph::{
    company_node_id, education_node_id, person_node_id, skill_node_id, CompanyProps,
    EducationProps, EdgeProperties, EmploymentProps, GraduationProps, GraphStore, HasSkillProps,
    NodeProperties, PersonProps, SkillProps,
};
use crate::storage::{CvStore, JobStatus};

use super::extractor::{CvExtraction, CvExtractor};

/// Bounded ingest queue size
pub const INGEST_QUEUE_CAPACITY: usize = 50;

/// One unit of extraction work
#[derive(Debug)]
pub struct IngestJob {
    pub job_id: i64,
    pub cv_file_id: i64,
    pub text: String,
}

/// Long-lived extraction worker
pub struct IngestWorker {
    jobs: mpsc::Receiver<IngestJob>,
    cv_store: CvStore,
    graph: GraphStore,
    extractor: CvExtractor,
    embeddings: Option<EmbeddingQueue>,
}

impl IngestWorker {
    pub fn new(
        jobs: mpsc::Receiver<IngestJob>,
        cv_store: CvStore,
        graph: GraphStore,
        extractor: CvExtractor,
        embeddings: Option<EmbeddingQueue>,
    ) -> Self {
        Self {
            jobs,
            cv_store,
            graph,
            extractor,
            embeddings,
        }
    }

    /// Drain the queue until every sender is gone
    pub async fn run(mut self) {
        info!("Ingest worker started");

        while let Some(job) = self.jobs.recv().await {
            let job_id = job.job_id;
            info!(job_id, cv_file_id = job.cv_file_id, "Processing ingest job");
            self.process(job).await;
            info!(job_id, "Ingest job finished");
        }

        info!("Ingest worker stopped");
    }

    async fn process(&self, job: IngestJob) {
        if let Err(e) = self
            .cv_store
            .update_job_status(job.job_id, JobStatus::Processing, None)
            .await
        {
            error!(job_id = job.job_id, error = %e, "Failed to mark job processing");
            return;
        }

        let extraction = match self.extractor.extract(&job.text).await {
            Ok(extraction) => extraction,
            Err(e) => {
                let message = format!("LLM extraction failed: {e}");
                warn!(job_id = job.job_id, %message, "Ingest job failed");
                self.fail_job(job.job_id, &message).await;
                return;
            }
        };

        self.record_provenance(job.cv_file_id, &extraction).await;

        if let Err(e) = write_extraction(&self.graph, job.cv_file_id, &extraction).await {
            let message = format!("graph write failed: {e}");
            error!(job_id = job.job_id, %message, "Ingest job failed");
            self.fail_job(job.job_id, &message).await;
            return;
        }

        if let Err(e) = self
            .cv_store
            .update_job_status(job.job_id, JobStatus::Completed, None)
            .await
        {
            error!(job_id = job.job_id, error = %e, "Failed to mark job completed");
        }

        // Queue embedding work for whatever the graph does not have vectors
        // for yet; a missing or full queue only delays vector visibility.
        if let Some(queue) = &self.embeddings {
            match self.graph.nodes_without_embeddings().await {
                Ok(node_ids) if !node_ids.is_empty() => {
                    queue.enqueue(job.cv_file_id, node_ids);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(job_id = job.job_id, error = %e, "Could not list unembedded nodes");
                }
            }
        }
    }

    async fn fail_job(&self, job_id: i64, message: &str) {
        if let Err(e) = self
            .cv_store
            .update_job_status(job_id, JobStatus::Failed, Some(message))
            .await
        {
            error!(job_id, error = %e, "Failed to mark job failed");
        }
    }

    async fn record_provenance(&self, cv_file_id: i64, extraction: &CvExtraction) {
        for skill in &extraction.skills {
            let _ = self
                .cv_store
                .save_entity(cv_file_id, "skill", &skill.name, skill.confidence)
                .await;
        }
        for company in &extraction.companies {
            let _ = self
                .cv_store
                .save_entity(cv_file_id, "company", &company.name, company.confidence)
                .await;
        }
        for education in &extraction.education {
            let _ = self
                .cv_store
                .save_entity(cv_file_id, "education", &education.institution, 0.9)
                .await;
        }
        for location in &extraction.locations {
            let _ = self
                .cv_store
                .save_entity(cv_file_id, "location", location, 0.85)
                .await;
        }
    }
}

/// Write one extraction's nodes and edges into the graph
pub async fn write_extraction(
    graph: &GraphStore,
    cv_id: i64,
    extraction: &CvExtraction,
) -> Result<()> {
    let candidate = &extraction.candidate;

    let person_id = person_node_id(cv_id);
    let person_db_id = graph
        .upsert_node(
            &person_id,
            &NodeProperties::Person(PersonProps {
                cv_id: Some(cv_id),
                name: candidate.name.clone(),
                current_position: candidate.current_position.clone(),
                seniority: candidate.seniority.clone(),
                total_experience_years: candidate.total_experience_years,
                extra: Default::default(),
            }),
        )
        .await?;

    for skill in &extraction.skills {
        if skill.name.is_empty() {
            continue;
        }

        let skill_db_id = graph
            .upsert_node(
                &skill_node_id(&skill.name),
                &NodeProperties::Skill(SkillProps {
                    name: skill.name.clone(),
                    proficiency: skill.proficiency.clone(),
                    extra: Default::default(),
                }),
            )
            .await?;

        graph
            .upsert_edge(
                person_db_id,
                skill_db_id,
                &EdgeProperties::HasSkill(HasSkillProps {
                    proficiency: skill.proficiency.clone(),
                    years_of_experience: skill.years,
                    extra: Default::default(),
                }),
            )
            .await?;
    }

    let any_current = extraction.companies.iter().any(|c| c.is_current);
    for (i, company) in extraction.companies.iter().enumerate() {
        if company.name.is_empty() {
            continue;
        }

        let company_db_id = graph
            .upsert_node(
                &company_node_id(&company.name),
                &NodeProperties::Company(CompanyProps {
                    name: company.name.clone(),
                    extra: Default::default(),
                }),
            )
            .await?;

        let employment = EmploymentProps {
            position: company.position.clone(),
            extra: Default::default(),
        };
        // Resumes list the current employer first; treat the first entry as
        // current when none is marked
        let edge = if company.is_current || (i == 0 && !any_current) {
            EdgeProperties::WorksAt(employment)
        } else {
            EdgeProperties::WorkedAt(employment)
        };

        graph.upsert_edge(person_db_id, company_db_id, &edge).await?;
    }

    for education in &extraction.education {
        if education.institution.is_empty() {
            continue;
        }

        let education_db_id = graph
            .upsert_node(
                &education_node_id(&education.institution),
                &NodeProperties::Education(EducationProps {
                    institution: education.institution.clone(),
                    degree: education.degree.clone(),
                    field: education.field.clone(),
                    graduation_year: education.graduation_year,
                    extra: Default::default(),
                }),
            )
            .await?;

        graph
            .upsert_edge(
                person_db_id,
                education_db_id,
                &EdgeProperties::GraduatedFrom(GraduationProps {
                    degree: education.degree.clone(),
                    field: education.field.clone(),
                    extra: Default::default(),
                }),
            )
            .await?;
    }

    Ok(())
}
