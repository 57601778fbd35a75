use tembea_core::domain::location::Homebase;
use tembea_core::errors::ServiceError;

use super::Repositories;

#[derive(Clone)]
pub struct HomebaseService {
    repos: Repositories,
}

impl HomebaseService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Homebases live in one of the known countries; names are unique.
    pub async fn create_homebase(
        &self,
        name: &str,
        country: &str,
    ) -> Result<Homebase, ServiceError> {
        let country = self
            .repos
            .locations
            .find_country_by_name(country.trim())
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!("The country {} does not exist", country.trim()))
            })?;

        if self.repos.locations.find_homebase_by_name(name.trim()).await?.is_some() {
            return Err(ServiceError::conflict(format!(
                "The homebase {} already exists",
                name.trim()
            )));
        }
        Ok(self.repos.locations.create_homebase(name.trim(), country.id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::HomebaseService;
    use crate::services::test_support::setup;

    #[tokio::test]
    async fn homebase_needs_a_known_country_and_a_fresh_name() {
        let (_pool, repos) = setup().await;
        let service = HomebaseService::new(repos);

        let nairobi = service.create_homebase("Nairobi", "Kenya").await.expect("create");
        assert_eq!(nairobi.name, "Nairobi");

        let duplicate = service.create_homebase("Nairobi", "Kenya").await.expect_err("duplicate");
        assert!(matches!(duplicate, tembea_core::errors::ServiceError::Conflict(_)));

        let unknown = service.create_homebase("Atlantis", "Oceania").await.expect_err("country");
        assert!(unknown.is_not_found());
    }
}
