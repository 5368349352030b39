//! Service layer for visadex-api

pub mod city_generator;
pub mod classifier;
pub mod country_loader;
pub mod enrichment;
pub mod openai;
pub mod response_log;

pub use city_generator::CityGenerator;
pub use classifier::{Classification, Classifier, ClassifyError, OpenAiClassifier};
pub use country_loader::CountryLoader;
pub use enrichment::{EnrichmentController, EnrichmentSettings, StartOutcome, StopOutcome, VisaStore};
pub use openai::{OpenAiClient, OpenAiError};
pub use response_log::ResponseLog;
