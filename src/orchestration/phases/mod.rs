//! One file per phase (spec.md §4.13). Each exposes an async `run` taking
//! `&mut OrchestratorContext` and returning a `PhaseOutcome`, grounded on
//! the teacher's `crawl_pages` event-emission idiom (`bus.publish(CrawlEvent::...)`).

pub mod bootstrap;
pub mod complete;
pub mod conflict;
pub mod confirm;
pub mod discovery;
pub mod download;
