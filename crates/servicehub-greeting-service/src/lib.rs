//! Demo service package: greets people by name.

use servicehub_sdk::prelude::*;

#[derive(Default)]
pub struct GreetingService;

impl Service for GreetingService {
    fn name(&self) -> String {
        "Greeting Service".to_string()
    }

    fn help(&self) -> String {
        "This service greets the person by name.".to_string()
    }

    fn execute(&self, input: &str) -> Result<String, ServiceError> {
        Ok(format!("Hello, {input}!"))
    }
}

servicehub_sdk::export_service!(GreetingService);
