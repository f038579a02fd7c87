//! # codepal-server
//!
//! HTTP surface of codepal.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /ai/chat?memoryId=&message=` | `text/event-stream` of answer tokens |
//! | `GET /ai/chat/sync?message=` | plain-text answer |
//! | `GET /ai/chat/report?message=` | JSON learning report |
//! | `GET /ai/chat/rag?message=` | JSON answer with its source files |
//! | `GET /health` | `ok` |

pub mod bootstrap;
pub mod server;

pub use bootstrap::{KNOWLEDGE_COLLECTION, build_service, build_tools};
pub use server::{ApiError, AppState, ServerConfig, app_router, run_server};
