//! Providers and their drivers and cabs.
//!
//! Removing a driver or cab that still serves active route batches asks each
//! affected provider to pick a replacement.

use std::collections::BTreeMap;

use tracing::info;

use tembea_core::domain::fleet::{
    Cab, Driver, DriverChanges, NewCab, NewDriver, NewProvider, Provider,
};
use tembea_core::domain::ids::{CabId, DriverId, ProviderId};
use tembea_core::errors::ServiceError;
use tembea_core::{Page, PageRequest, RouteBatch, RouteBatchDetails};
use tembea_slack::Delivery;

use super::{Repositories, TeamDetailsService};

pub const DRIVER_UPDATE_FAILED: &str = "Update Failed. Driver does not exist";
const REPLACEMENT_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct ProviderService {
    repos: Repositories,
}

impl ProviderService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// The provider is owned by the existing user with `owner_email`.
    pub async fn create_provider(
        &self,
        name: &str,
        owner_email: &str,
        is_direct_message: bool,
        channel_id: Option<String>,
    ) -> Result<Provider, ServiceError> {
        let owner = self
            .repos
            .users
            .find_by_email(owner_email.trim())
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!(
                    "The user with email: '{}' does not exist",
                    owner_email.trim()
                ))
            })?;
        Ok(self
            .repos
            .providers
            .create(NewProvider {
                name: name.trim().to_string(),
                provider_user_id: owner.id,
                is_direct_message,
                channel_id: channel_id.filter(|channel| !channel.trim().is_empty()),
            })
            .await?)
    }

    pub async fn find_by_pk(&self, id: ProviderId) -> Result<Provider, ServiceError> {
        self.repos
            .providers
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Provider doesnt exist"))
    }

    pub async fn get_provider_by_slack_id(
        &self,
        slack_id: &str,
    ) -> Result<Option<Provider>, ServiceError> {
        Ok(self.repos.providers.find_by_user_slack_id(slack_id).await?)
    }

    pub async fn get_providers(&self, page: PageRequest) -> Result<Page<Provider>, ServiceError> {
        let (providers, total) = self.repos.providers.list(page).await?;
        Ok(Page::new(providers, page, total))
    }
}

/// A deleted fleet item and how many providers were asked to replace it.
#[derive(Clone, Debug, PartialEq)]
pub struct Removal<T> {
    pub removed: T,
    pub providers_notified: usize,
}

#[derive(Clone)]
pub struct DriverService {
    repos: Repositories,
    teams: TeamDetailsService,
}

impl DriverService {
    pub fn new(repos: Repositories, teams: TeamDetailsService) -> Self {
        Self { repos, teams }
    }

    /// Find-or-create by driver number. Returns the driver and whether it was created.
    pub async fn create(&self, driver: NewDriver) -> Result<(Driver, bool), ServiceError> {
        let existing = self
            .repos
            .drivers
            .find_by_number(driver.driver_number.trim())
            .await?;
        if let Some(existing) = existing {
            return Ok((existing, false));
        }
        self.repos
            .providers
            .find_by_id(driver.provider_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Provider doesnt exist"))?;
        Ok((self.repos.drivers.create(driver).await?, true))
    }

    pub async fn get_drivers(
        &self,
        provider_id: Option<ProviderId>,
        page: PageRequest,
    ) -> Result<Page<Driver>, ServiceError> {
        let (drivers, total) = self.repos.drivers.list(provider_id, page).await?;
        Ok(Page::new(drivers, page, total))
    }

    pub async fn get_driver_by_id(&self, id: DriverId) -> Result<Driver, ServiceError> {
        self.repos
            .drivers
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Driver does not exist"))
    }

    pub async fn exists(
        &self,
        email: Option<&str>,
        phone_no: Option<&str>,
        driver_number: Option<&str>,
        exclude: Option<DriverId>,
    ) -> Result<bool, ServiceError> {
        Ok(self.repos.drivers.exists(email, phone_no, driver_number, exclude).await?)
    }

    pub async fn update(
        &self,
        id: DriverId,
        changes: DriverChanges,
    ) -> Result<Driver, ServiceError> {
        let mut driver = self
            .repos
            .drivers
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(DRIVER_UPDATE_FAILED))?;
        let taken = self
            .exists(
                changes.email.as_deref(),
                changes.driver_phone_no.as_deref(),
                changes.driver_number.as_deref(),
                Some(id),
            )
            .await?;
        if taken {
            return Err(ServiceError::conflict(
                "Driver with the same email, phone number or driver number already exists",
            ));
        }
        driver.apply(changes);
        self.repos.drivers.update(&driver).await?;
        Ok(driver)
    }

    /// Hard delete. Providers whose active batches lose their driver are asked to
    /// assign another one.
    pub async fn delete_driver(&self, id: DriverId) -> Result<Removal<Driver>, ServiceError> {
        let driver = self.get_driver_by_id(id).await?;
        let affected = affected_batches(&self.repos, |batch| batch.driver_id == Some(id)).await?;
        self.repos.drivers.delete(id).await?;

        let notifier = self.teams.default_notifier();
        let mut providers_notified = 0;
        for (provider_id, batches) in affected {
            let owner = provider_with_owner(&self.repos, provider_id).await?;
            let Some((provider, owner_slack_id)) = owner else {
                continue;
            };
            let (drivers, _) = self
                .repos
                .drivers
                .list(Some(provider_id), PageRequest::new(Some(1), Some(REPLACEMENT_PAGE_SIZE)))
                .await?;
            let delivery = notifier
                .send_reassign_driver(&provider, &owner_slack_id, &driver, &batches, &drivers)
                .await;
            if delivery == Delivery::Sent {
                providers_notified += 1;
            }
        }
        info!(
            event_name = "fleet.driver.deleted",
            driver_id = id.0,
            providers_notified,
            "driver removed"
        );
        Ok(Removal { removed: driver, providers_notified })
    }
}

#[derive(Clone)]
pub struct CabService {
    repos: Repositories,
    teams: TeamDetailsService,
}

impl CabService {
    pub fn new(repos: Repositories, teams: TeamDetailsService) -> Self {
        Self { repos, teams }
    }

    pub async fn create(&self, cab: NewCab) -> Result<Cab, ServiceError> {
        if cab.capacity == 0 {
            return Err(ServiceError::BadRequest(
                "capacity must be a non-zero integer greater than zero".to_string(),
            ));
        }
        self.repos
            .providers
            .find_by_id(cab.provider_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Provider doesnt exist"))?;
        self.repos.cabs.create(cab).await.map_err(|error| match error.is_unique_violation() {
            true => ServiceError::conflict("Cab with registration number already exists"),
            false => error.into(),
        })
    }

    pub async fn get_cab_by_id(&self, id: CabId) -> Result<Cab, ServiceError> {
        self.repos
            .cabs
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cab does not exist"))
    }

    pub async fn find_by_reg_number(&self, reg_number: &str) -> Result<Cab, ServiceError> {
        self.repos
            .cabs
            .find_by_reg_number(reg_number.trim())
            .await?
            .ok_or_else(|| ServiceError::not_found("Cab does not exist"))
    }

    pub async fn get_cabs(
        &self,
        provider_id: Option<ProviderId>,
        page: PageRequest,
    ) -> Result<Page<Cab>, ServiceError> {
        let (cabs, total) = self.repos.cabs.list(provider_id, page).await?;
        Ok(Page::new(cabs, page, total))
    }

    pub async fn delete_cab(&self, id: CabId) -> Result<Removal<Cab>, ServiceError> {
        let cab = self
            .repos
            .cabs
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cab does not exist"))?;
        let affected = affected_batches(&self.repos, |batch| batch.cab_id == Some(id)).await?;
        self.repos.cabs.delete(id).await?;

        let notifier = self.teams.default_notifier();
        let mut providers_notified = 0;
        for (provider_id, batches) in affected {
            let owner = provider_with_owner(&self.repos, provider_id).await?;
            let Some((provider, owner_slack_id)) = owner else {
                continue;
            };
            let (cabs, _) = self
                .repos
                .cabs
                .list(Some(provider_id), PageRequest::new(Some(1), Some(REPLACEMENT_PAGE_SIZE)))
                .await?;
            let delivery = notifier
                .send_reassign_cab(&provider, &owner_slack_id, &cab, &batches, &cabs)
                .await;
            if delivery.is_sent() {
                providers_notified += 1;
            }
        }
        Ok(Removal { removed: cab, providers_notified })
    }
}

/// Active batches matching `affected`, grouped by their provider.
async fn affected_batches(
    repos: &Repositories,
    affected: impl Fn(&RouteBatch) -> bool,
) -> Result<BTreeMap<ProviderId, Vec<RouteBatchDetails>>, ServiceError> {
    let mut grouped: BTreeMap<ProviderId, Vec<RouteBatchDetails>> = BTreeMap::new();
    for batch in repos.routes.list_active_batches().await? {
        let Some(provider_id) = batch.provider_id.filter(|_| affected(&batch)) else {
            continue;
        };
        grouped.entry(provider_id).or_default().push(repos.batch_details(batch).await?);
    }
    Ok(grouped)
}

async fn provider_with_owner(
    repos: &Repositories,
    provider_id: ProviderId,
) -> Result<Option<(Provider, String)>, ServiceError> {
    let Some(provider) = repos.providers.find_by_id(provider_id).await? else {
        return Ok(None);
    };
    let owner = repos.user(provider.provider_user_id).await?;
    Ok(Some((provider, owner.slack_id)))
}
