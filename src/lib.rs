//! Dunning drafts collection messages for delinquent customer accounts.
//!
//! Imports the store's delinquency report, renders one prompt per customer
//! in the tone the operator picked, and drives the Gemini API through a
//! strictly sequential pipeline that paces requests and backs off on
//! throttling. Results stream back one record at a time for copy or
//! WhatsApp hand-off.
//!
//! See `DESIGN.md` for architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod logging;
pub mod providers;

pub mod messaging;
pub mod records;

pub mod pipeline;
