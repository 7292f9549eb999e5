//! Interface de linha de comando do CALLFLOW baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (demo, ticket)
//! e a flag global --verbose.

use clap::{Parser, Subcommand};

/// CALLFLOW — motor de protocolos e sessões de chamada.
#[derive(Debug, Parser)]
#[command(name = "callflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa a demonstração embutida: sessão de chamada, escalonamento
    /// em protocolo e ciclo de vida completo até o fechamento.
    Demo,

    /// Mostra um protocolo e seu histórico a partir do backend configurado.
    Ticket {
        /// Id interno ou número do protocolo.
        key: String,
    },
}
