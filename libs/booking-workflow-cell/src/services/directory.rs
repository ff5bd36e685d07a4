use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::models::{AppointmentRequest, EntityOption, ReferenceOption, WorkflowError};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn search(&self, term: &str) -> Result<Vec<EntityOption>, WorkflowError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn search(&self, term: &str) -> Result<Vec<EntityOption>, WorkflowError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReferenceData: Send + Sync {
    async fn list_services(&self) -> Result<Vec<ReferenceOption>, WorkflowError>;

    async fn list_reasons(&self) -> Result<Vec<ReferenceOption>, WorkflowError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Scheduling: Send + Sync {
    /// `utc_date_time` is in canonical `YYYY-MM-DD HH:MM:SS` form.
    async fn check_availability(
        &self,
        doctor_id: &str,
        utc_date_time: &str,
    ) -> Result<bool, WorkflowError>;

    async fn create_appointment(&self, request: &AppointmentRequest) -> Result<(), WorkflowError>;
}
