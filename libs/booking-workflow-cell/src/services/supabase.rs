use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AppointmentRequest, EntityOption, ReferenceOption, WorkflowConfig, WorkflowError};
use crate::services::directory::{DoctorDirectory, PatientDirectory, ReferenceData, Scheduling};

/// `{label, value}` rows returned by the picklist and search functions.
#[derive(Debug, Deserialize)]
struct PicklistEntry {
    value: String,
    label: String,
}

#[derive(Debug, Deserialize)]
struct ServiceRow {
    id: String,
    name: String,
}

/// Supabase-backed implementation of every remote collaborator the workflow needs.
#[derive(Clone)]
pub struct SupabaseBookingBackend {
    supabase: SupabaseClient,
    search_limit: usize,
}

impl SupabaseBookingBackend {
    pub fn new(config: &AppConfig, workflow_config: &WorkflowConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            search_limit: workflow_config.search_limit,
        }
    }

    async fn search_directory(
        &self,
        function: &str,
        term: &str,
    ) -> Result<Vec<EntityOption>, WorkflowError> {
        debug!("Calling {} with term {:?}", function, term);

        let rows: Vec<PicklistEntry> = self
            .supabase
            .rpc(
                function,
                json!({
                    "search_term": term,
                    "result_limit": self.search_limit
                }),
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| EntityOption::new(row.value, row.label))
            .collect())
    }
}

#[async_trait]
impl PatientDirectory for SupabaseBookingBackend {
    async fn search(&self, term: &str) -> Result<Vec<EntityOption>, WorkflowError> {
        self.search_directory("search_patients", term).await
    }
}

#[async_trait]
impl DoctorDirectory for SupabaseBookingBackend {
    async fn search(&self, term: &str) -> Result<Vec<EntityOption>, WorkflowError> {
        self.search_directory("search_doctors", term).await
    }
}

#[async_trait]
impl ReferenceData for SupabaseBookingBackend {
    async fn list_services(&self) -> Result<Vec<ReferenceOption>, WorkflowError> {
        let rows: Vec<ServiceRow> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/services?select=id,name&is_active=eq.true&order=name.asc",
                None,
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ReferenceOption::new(row.id, row.name))
            .collect())
    }

    async fn list_reasons(&self) -> Result<Vec<ReferenceOption>, WorkflowError> {
        let rows: Vec<PicklistEntry> = self.supabase.rpc("get_visit_reasons", json!({})).await?;

        Ok(rows
            .into_iter()
            .map(|row| ReferenceOption::new(row.value, row.label))
            .collect())
    }
}

#[async_trait]
impl Scheduling for SupabaseBookingBackend {
    async fn check_availability(
        &self,
        doctor_id: &str,
        utc_date_time: &str,
    ) -> Result<bool, WorkflowError> {
        debug!("Checking availability of doctor {} at {}", doctor_id, utc_date_time);

        let available: bool = self
            .supabase
            .rpc(
                "check_appointment_availability",
                json!({
                    "doctor_id": doctor_id,
                    "appointment_datetime": utc_date_time
                }),
            )
            .await?;

        Ok(available)
    }

    async fn create_appointment(&self, request: &AppointmentRequest) -> Result<(), WorkflowError> {
        let appointment_data = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "appointment_datetime": request.utc_date_time,
            "service_id": request.service_id,
            "reason_for_visit": request.reason_value,
            "status": "scheduled"
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(appointment_data),
                Some(headers),
            )
            .await?;

        if result.is_empty() {
            return Err(WorkflowError::Remote("Failed to create appointment".to_string()));
        }

        let appointment_id = result[0].get("id").cloned().unwrap_or(Value::Null);
        debug!("Appointment created with ID: {}", appointment_id);
        Ok(())
    }
}
