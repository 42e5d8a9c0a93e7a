//! Demo service package: dismisses people by name.

use servicehub_sdk::prelude::*;

#[derive(Default)]
pub struct ByeService;

impl Service for ByeService {
    fn name(&self) -> String {
        "Bye bye Service".to_string()
    }

    fn help(&self) -> String {
        "This service dismiss the person by name.".to_string()
    }

    fn execute(&self, input: &str) -> Result<String, ServiceError> {
        Ok(format!("Bye bye, {input}!"))
    }
}

servicehub_sdk::export_service!(ByeService);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dismisses_by_name() {
        let service = ByeService;
        assert_eq!(service.execute("Ana").unwrap(), "Bye bye, Ana!");
    }
}
