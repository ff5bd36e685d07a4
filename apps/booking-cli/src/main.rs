use std::sync::Arc;

use dotenv::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use booking_workflow_cell::{
    BookingFormState, BookingWorkflow, BroadcastNotifier, Collaborators, SearchField,
    SubmissionOutcome, SupabaseBookingBackend, WorkflowConfig,
};
use shared_config::AppConfig;

const HELP: &str = "\
Commands:
  patient <text>        type into the patient search box
  doctor <text>         type into the doctor search box
  select-patient <id>   pick a patient from the current candidates
  select-doctor <id>    pick a doctor from the current candidates
  datetime <value>      set the appointment time (YYYY-MM-DDTHH:MM, local)
  service <id>          choose a service
  reason <value>        choose a visit reason
  show                  print the form
  submit                book the appointment
  reset                 clear the form
  quit                  exit";

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting booking workflow console");

    let config = AppConfig::from_env();
    if !config.is_configured() {
        warn!("Supabase is not configured; remote calls will fail");
    }
    let workflow_config = WorkflowConfig::from_env();

    let notifier = Arc::new(BroadcastNotifier::default());
    let mut notifications = notifier.subscribe();
    tokio::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            println!(
                "[{:?}] {}: {}",
                notification.severity, notification.title, notification.message
            );
        }
    });

    let backend = Arc::new(SupabaseBookingBackend::new(&config, &workflow_config));
    let workflow = match BookingWorkflow::new(
        Collaborators::from_backend(backend),
        notifier,
        &workflow_config,
    ) {
        Ok(workflow) => workflow,
        Err(e) => {
            error!("Failed to start booking workflow: {}", e);
            std::process::exit(1);
        }
    };

    workflow.start().await;
    println!("{}", HELP);
    println!("Earliest bookable time: {}", workflow.minimum_allowed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        };

        let (command, argument) = match line.trim().split_once(' ') {
            Some((command, argument)) => (command, argument.trim()),
            None => (line.trim(), ""),
        };

        match command {
            "" => continue,
            "patient" => {
                workflow.on_patient_input_changed(argument);
                workflow.on_patient_input_settled(argument);
            }
            "doctor" => {
                workflow.on_doctor_input_changed(argument);
                workflow.on_doctor_input_settled(argument);
            }
            "select-patient" => {
                if !workflow.on_patient_selected(argument) {
                    println!("No patient candidate with id {}", argument);
                }
            }
            "select-doctor" => {
                if !workflow.on_doctor_selected(argument) {
                    println!("No doctor candidate with id {}", argument);
                }
            }
            "datetime" => workflow.set_date_time(argument),
            "service" => workflow.set_service(argument),
            "reason" => workflow.set_reason(argument),
            "show" => print_state(&workflow.state()),
            "submit" => match workflow.submit().await {
                Ok(SubmissionOutcome::Success) => println!("Booked."),
                Ok(outcome) => println!("Not booked: {:?}", outcome),
                Err(e) => println!("{}", e),
            },
            "reset" => workflow.reset(),
            "quit" | "exit" => break,
            _ => println!("{}", HELP),
        }
    }

    info!("Booking workflow console stopped");
}

fn print_state(state: &BookingFormState) {
    print_field("Patient", &state.patient);
    print_field("Doctor", &state.doctor);

    println!("Date/time: {}", state.local_date_time);
    if let Some(message) = &state.time_validation_error {
        println!("  ! {}", message);
    }

    println!("Service: {}", state.service_id);
    for option in &state.service_options {
        println!("  {} = {}", option.value, option.label);
    }

    println!("Reason: {}", state.reason_value);
    for option in &state.reason_options {
        println!("  {} = {}", option.value, option.label);
    }

    println!("Submission: {:?}", state.submission_phase);
}

fn print_field(name: &str, field: &SearchField) {
    if field.has_selection() {
        println!("{}: {} ({})", name, field.selected_entity_label, field.selected_entity_id);
    } else {
        println!("{}: {:?}", name, field.raw_input_text);
    }

    if field.is_loading {
        println!("  searching...");
    }
    for candidate in &field.candidate_list {
        println!("  {} = {}", candidate.id, candidate.label);
    }
}
