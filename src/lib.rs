//! Export survey data from the Nfield API: submit an export job, wait until the service finished
//! it and download the produced archive.

pub mod download;
pub mod error;
pub mod model;
pub mod poller;
pub mod progress;
pub mod service;
pub mod workflow;
