//! Configuração do CALLFLOW carregada a partir de `callflow.toml`.
//!
//! A struct [`CallflowConfig`] contém os parâmetros de conexão com o
//! backend hospedado. Valores não presentes no arquivo usam defaults
//! sensíveis. A variável de ambiente `CALLFLOW_API_KEY` tem precedência
//! sobre o arquivo.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// Configuração de nível superior carregada de `callflow.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct CallflowConfig {
    /// Chave de API do backend.
    #[serde(default)]
    pub api_key: String,

    /// URL base do backend hospedado.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Identificador do operador logado nesta estação.
    #[serde(default)]
    pub operator_id: String,

    /// Departamento padrão para novos protocolos.
    #[serde(default = "default_department")]
    pub default_department: String,
}

// URL padrão do backend.
fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

// Departamento padrão: "support".
fn default_department() -> String {
    "support".to_string()
}

impl Default for CallflowConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            operator_id: String::new(),
            default_department: default_department(),
        }
    }
}

impl CallflowConfig {
    /// Carrega a configuração de `callflow.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("callflow.toml"))
    }

    /// Carrega a configuração de um caminho específico.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<CallflowConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo para a chave API.
        if let Ok(key) = std::env::var("CALLFLOW_API_KEY")
            && !key.is_empty()
        {
            config.api_key = key;
        }

        Ok(config)
    }
}
