//! # Coinshop API
//!
//! HTTP server for the coin ledger.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Coinshop API                                    │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  routes        │  │  service       │  │  auth / password           ││
//! │  │                │  │                │  │                            ││
//! │  │ • /api/auth    │─►│ LedgerFacade   │─►│ • SessionIssuer (JWT)      ││
//! │  │ • /api/info    │  │ • authenticate │  │ • CredentialHasher (Argon2)││
//! │  │ • /api/sendCoin│  │ • summary      │  │                            ││
//! │  │ • /api/buy     │  │ • transfer     │  └────────────────────────────┘│
//! │  │ • /health      │  │ • purchase     │                                │
//! │  └────────────────┘  └───────┬────────┘                                │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                    coinshop-db (SQLite ledger store)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`]. Every key can be set through `COINSHOP__SECTION__KEY`:
//! - `COINSHOP__HTTP__PORT` - listener port (default: 8080)
//! - `COINSHOP__DATABASE__PATH` - SQLite file (default: coinshop.db)
//! - `COINSHOP__AUTH__JWT_SECRET` - token signing secret
//! - `COINSHOP__AUTH__TOKEN_TTL_SECS` - token lifetime (default: never expires)
//! - `COINSHOP__LOG_FORMAT` - `pretty` or `json`

pub mod auth;
pub mod config;
pub mod error;
pub mod password;
pub mod routes;
pub mod service;

// Re-exports
pub use config::AppConfig;
pub use error::{ApiError, AuthError};
pub use service::LedgerFacade;
