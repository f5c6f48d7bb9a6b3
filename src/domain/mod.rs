//! Domain layer containing business entities and contracts.
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`events`] - Messages flowing through the background pipeline
//! - [`ports`] - Pipeline dispatch and URL classification contracts
//!
//! The domain layer has no dependencies on infrastructure or presentation layers.
//!
//! # Post-creation flow
//!
//! 1. A short URL is stored unclassified and a [`events::SafetyCheckRequest`] is dispatched
//! 2. The classifier verdict is written back for the target
//! 3. Optionally a [`events::QrCodeRequest`] renders and stores a QR image
//! 4. Every served redirect emits a [`events::ClickEvent`]

pub mod entities;
pub mod events;
pub mod ports;
pub mod repositories;
