//! Interface de terminal do CALLFLOW — spinner de chamada e saída colorida.
//!
//! Usa as crates `indicatif` para o spinner durante a chamada e `console`
//! para estilização com cores. O [`CallProgress`] acompanha visualmente
//! uma sessão de chamada no terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use callflow::{Ticket, TicketEvent};

/// Indicador visual de uma chamada em andamento no terminal.
pub struct CallProgress {
    // Spinner do indicatif.
    pb: ProgressBar,
    green: Style,
    cyan: Style,
}

impl CallProgress {
    /// Inicia o spinner com o nome do contato.
    pub fn start(contact_name: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(format!("Em chamada com {contact_name}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            cyan: Style::new().cyan(),
        }
    }

    /// Finaliza o spinner exibindo a duração da chamada.
    pub fn finish(&self, call_secs: i64) {
        self.pb.finish_and_clear();
        println!(
            "  {} Chamada encerrada ({})",
            self.green.apply_to("✓"),
            self.cyan.apply_to(format!("{call_secs}s"))
        );
    }
}

/// Imprime o cabeçalho de um protocolo com o status colorido.
pub fn print_ticket(ticket: &Ticket) {
    let status_style = match ticket.status {
        callflow::TicketStatus::Closed => Style::new().green().bold(),
        callflow::TicketStatus::ResolvedPending => Style::new().yellow().bold(),
        _ => Style::new().cyan().bold(),
    };
    println!(
        "#{} [{}] {} — prioridade {} — SLA até {}",
        ticket.number,
        status_style.apply_to(ticket.status),
        ticket.title,
        ticket.priority,
        ticket.sla_due_at.format("%Y-%m-%d %H:%M")
    );
}

/// Imprime o histórico de eventos de um protocolo em ordem causal.
pub fn print_events(events: &[TicketEvent]) {
    let dim = Style::new().dim();
    for event in events {
        let change = match (&event.old_value, &event.new_value) {
            (Some(old), Some(new)) => format!("{old} → {new}"),
            (None, Some(new)) => format!("→ {new}"),
            _ => String::new(),
        };
        println!(
            "  {} {} {} {}",
            dim.apply_to(event.created_at.format("%H:%M:%S")),
            event.kind,
            change,
            event.note
        );
    }
}
