use crate::wire::HealthRes;

/// Simple health service shared by the REST router and the server binary
///
/// This service provides a standardised way to check that the telehealth API is up.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static method to check health without creating an instance
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Telehealth API is alive".into(),
        }
    }
}
