//! # Space Image Converter Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom
//! - `format`: Registro dei formati (token, estensioni, strategia di encode)
//! - `codec`: Decode/encode in-process tramite il crate `image`
//! - `transform`: Pianificazione e applicazione di orientamento, resize, grayscale, sRGB
//! - `external_encoder`: Encoder esterno (`cjxl`) e risoluzione dei tool
//! - `file_manager`: Discovery immagini e scrittura atomica
//! - `converter`: Orchestratore, engine per file, batch sequenziale, policy di overwrite
//! - `progress`: Progress bar e statistiche
//! - `json_output`: Eventi JSON per uso programmatico
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use space_image_converter::{Config, Converter, FormatId};
//! use space_image_converter::converter::TerminalPrompt;
//! use space_image_converter::external_encoder::{CjxlEncoder, ToolPathResolver};
//!
//! let config = Config { formats: vec![FormatId::Webp], ..Default::default() };
//! let encoder = CjxlEncoder::resolve(&ToolPathResolver::new());
//! let mut converter = Converter::new(config, encoder, Box::new(TerminalPrompt::new()));
//! converter.run(&path).await?;
//! ```

pub mod codec;
pub mod config;
pub mod converter;
pub mod error;
pub mod external_encoder;
pub mod file_manager;
pub mod format;
pub mod json_output;
pub mod progress;
pub mod transform;

pub use config::Config;
pub use converter::{Converter, RunReport};
pub use error::ConvertError;
pub use format::FormatId;
