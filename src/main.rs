mod cli;
mod ui;

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;

use callflow::{
    AuditQuestion, CallSession, CallType, CallflowConfig, Clock, Contact, HttpStore, ManualClock,
    MemoryStore, Operator, Priority, Role, Store, SubjectRef, Task, TicketDraft, TicketEngine,
};
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Demo => run_demo(cli.verbose).await,
        Command::Ticket { key } => show_ticket(&key).await,
    }
}

/// Fetch one ticket and its history from the configured backend.
async fn show_ticket(key: &str) -> Result<()> {
    let config = CallflowConfig::load()?;
    let store = HttpStore::new(&config.base_url, &config.api_key);

    let ticket = store.get_ticket(key).await?;
    let events = store.list_events(&ticket.id).await?;

    ui::print_ticket(&ticket);
    ui::print_events(&events);
    Ok(())
}

/// End-to-end demonstration against a seeded in-memory store: one timed
/// call session that escalates into a ticket, then the ticket's full
/// lifecycle through approval.
async fn run_demo(verbose: bool) -> Result<()> {
    let store = MemoryStore::new();
    let clock = Arc::new(ManualClock::new(Utc::now()));

    let agent = Operator::new("op-1", "Ana", Role::Agent);
    let admin = Operator::new("adm-1", "Bruno", Role::Admin);
    store.seed_operator(agent.clone());
    store.seed_operator(admin.clone());
    store.seed_contact(Contact {
        id: "ct-1".into(),
        name: "Dona Marta".into(),
        phone: "+55 11 98888-0001".into(),
        company: Some("Padaria Estrela".into()),
    });
    store.seed_task(Task::new(
        "ct-1",
        CallType::Sales,
        clock.now() + chrono::Duration::hours(4),
        "op-1",
    ));
    store.seed_questions(vec![
        AuditQuestion {
            id: "q_confirm".into(),
            prompt: "Cliente confirmou a resolução?".into(),
            options: vec!["yes".into(), "no".into()],
            call_types: vec![],
            order: 1,
            upsell_sensitive: false,
            closing: true,
        },
        AuditQuestion {
            id: "q_upgrade".into(),
            prompt: "Cliente aceitou upgrade de plano?".into(),
            options: vec!["yes".into(), "no".into()],
            call_types: vec![CallType::Sales],
            order: 2,
            upsell_sensitive: true,
            closing: false,
        },
    ]);

    // Call session: one pending contact at a time.
    let engine = TicketEngine::new(store.clone(), Arc::clone(&clock));
    let mut session = CallSession::new(engine, "op-1");
    session.load_next().await?;
    let contact_name = session.contact().map(|c| c.name.clone()).unwrap_or_default();

    session.start().await?;
    let progress = ui::CallProgress::start(&contact_name);
    // The demo clock jumps 42 seconds while the spinner runs briefly.
    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
    clock.advance_secs(42);
    session.end_call()?;
    progress.finish(session.call_secs(clock.now()));

    session.answer("q_confirm", "yes")?;
    session.answer("q_upgrade", "yes")?;
    session.note("q_upgrade", "cliente pediu proposta do plano premium")?;

    clock.advance_secs(75);
    let record = session
        .submit(
            "cliente interessado, enviar proposta",
            Some(TicketDraft {
                subject: SubjectRef::Prospect("ct-1".into()),
                department: "sales".into(),
                title: "Enviar proposta do plano premium".into(),
                description: "Contato pediu proposta por escrito durante a chamada".into(),
                priority: Priority::High,
                origin_call_type: Some(CallType::Sales),
            }),
        )
        .await?;

    println!(
        "Registro de chamada: {}s em chamada, {}s de relatório",
        record.call_secs, record.report_secs
    );
    if verbose {
        println!("{}", serde_json::to_string_pretty(&record)?);
    }

    // Ticket lifecycle: start → resolve → approve.
    let ticket_id = record
        .ticket_id
        .expect("demo escalation always opens a ticket");
    let engine = TicketEngine::new(store.clone(), Arc::clone(&clock));

    clock.advance_secs(3600);
    engine.start(&ticket_id, &agent).await?;

    clock.advance_secs(1800);
    let answers = vec![callflow::Answer::new("q_confirm", "yes")];
    engine
        .submit_resolution(&ticket_id, &agent, &answers, "proposta enviada por e-mail")
        .await?;

    clock.advance_secs(600);
    let ticket = engine.approve(&ticket_id, &admin).await?;

    ui::print_ticket(&ticket);
    ui::print_events(&store.list_events(&ticket.id).await?);
    Ok(())
}
