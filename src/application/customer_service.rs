use crate::application::ledger_service::retry_on_conflict;
use crate::domain::balance;
use crate::domain::error::DomainError;
use crate::domain::models::{Customer, CustomerForm, CustomerStatement};
use crate::domain::repository::{CustomerSnapshot, LedgerRepository, PhotoStore, UploadedPhoto};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub struct CustomerService<R: LedgerRepository, P: PhotoStore> {
    repository: Arc<R>,
    photos: Arc<P>,
    max_attempts: u32,
}

fn customer_not_found() -> anyhow::Error {
    DomainError::NotFound("Customer not found".to_string()).into()
}

impl<R: LedgerRepository, P: PhotoStore> CustomerService<R, P> {
    pub fn new(repository: Arc<R>, photos: Arc<P>, max_attempts: u32) -> Self {
        Self {
            repository,
            photos,
            max_attempts: max_attempts.max(1),
        }
    }

    async fn store_photo(&self, photo: Option<UploadedPhoto>) -> Result<Option<String>> {
        match photo {
            Some(photo) => Ok(Some(self.photos.store(photo).await?)),
            None => Ok(None),
        }
    }

    /// Drops a stored photo that never made it onto a customer record.
    async fn discard_photo(&self, path: Option<String>) {
        let Some(path) = path else { return };
        if let Err(e) = self.photos.remove(&path).await {
            warn!(path = %path, error = %e, "Failed to remove orphaned photo");
        }
    }

    #[instrument(skip(self))]
    pub async fn list_customers(&self, owner: &str) -> Result<Vec<Customer>> {
        self.repository.list_customers(owner).await
    }

    #[instrument(skip(self))]
    pub async fn get_customer(&self, owner: &str, id: Uuid) -> Result<Customer> {
        self.repository
            .find_customer(owner, id)
            .await?
            .ok_or_else(customer_not_found)
    }

    /// The form is validated before the photo is stored, so a rejected
    /// request leaves no file behind.
    #[instrument(skip(self, form, photo), fields(has_photo = photo.is_some()))]
    pub async fn create_customer(
        &self,
        owner: &str,
        form: CustomerForm,
        photo: Option<UploadedPhoto>,
    ) -> Result<Customer> {
        form.validate()?;
        let aadhar_photo = self.store_photo(photo).await?;
        let customer = match form.into_customer(owner, aadhar_photo.clone(), Utc::now()) {
            Ok(customer) => customer,
            Err(e) => {
                self.discard_photo(aadhar_photo).await;
                return Err(e.into());
            }
        };
        if let Err(e) = self.repository.insert_customer(customer.clone()).await {
            self.discard_photo(aadhar_photo).await;
            return Err(e);
        }
        info!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    #[instrument(skip(self, form, photo), fields(has_photo = photo.is_some()))]
    pub async fn update_customer(
        &self,
        owner: &str,
        id: Uuid,
        form: CustomerForm,
        photo: Option<UploadedPhoto>,
    ) -> Result<Customer> {
        // Check ownership before touching the photo store.
        self.get_customer(owner, id).await?;
        let aadhar_photo = self.store_photo(photo).await?;

        let form = &form;
        let stored_path = &aadhar_photo;
        let result = retry_on_conflict(self.max_attempts, "update_customer", move || async move {
            let mut customer = self.get_customer(owner, id).await?;
            let loaded_version = customer.version;
            form.apply_to(&mut customer);
            if let Some(path) = stored_path {
                customer.aadhar_photo = Some(path.clone());
            }
            customer.updated_at = Utc::now();
            self.repository
                .update_customer(owner, customer, loaded_version)
                .await
        })
        .await;
        let customer = match result {
            Ok(customer) => customer,
            Err(e) => {
                self.discard_photo(aadhar_photo).await;
                return Err(e);
            }
        };

        info!(customer_id = %customer.id, version = customer.version, "Customer updated");
        Ok(customer)
    }

    #[instrument(skip(self))]
    pub async fn delete_customer(&self, owner: &str, id: Uuid) -> Result<()> {
        if !self.repository.delete_customer(owner, id).await? {
            return Err(customer_not_found());
        }
        info!(customer_id = %id, "Customer removed");
        Ok(())
    }

    /// Recomputes the pending amount from the stored records and reports
    /// whether it agrees with the maintained balance.
    #[instrument(skip(self))]
    pub async fn statement(&self, owner: &str, id: Uuid) -> Result<CustomerStatement> {
        let CustomerSnapshot {
            customer,
            leases,
            payments,
        } = self
            .repository
            .customer_snapshot(owner, id)
            .await?
            .ok_or_else(customer_not_found)?;
        let computed = balance::recompute(&leases, &payments)?;
        let consistent = computed == customer.total_pending_amount;
        if consistent {
            debug!(balance = %computed, "Statement balance consistent");
        } else {
            warn!(
                stored = %customer.total_pending_amount,
                computed = %computed,
                "Stored balance differs from recomputed balance"
            );
        }
        Ok(CustomerStatement {
            customer,
            leases,
            payments,
            computed_pending_amount: computed,
            consistent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ledger_service::LedgerService;
    use crate::data::memory::InMemoryLedgerRepository;
    use crate::domain::models::{Amount, CreateLease, CreatePayment, Lease, Payment, PaymentMethod};
    use crate::domain::repository::LedgerWrite;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPhotoStore {
        stored: Mutex<Vec<UploadedPhoto>>,
        removed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PhotoStore for RecordingPhotoStore {
        async fn store(&self, photo: UploadedPhoto) -> Result<String> {
            let mut stored = self.stored.lock().unwrap();
            stored.push(photo);
            Ok(format!("uploads/photo-{}.png", stored.len()))
        }

        async fn remove(&self, path: &str) -> Result<()> {
            self.removed.lock().unwrap().push(path.to_string());
            Ok(())
        }
    }

    /// Delegates to the in-memory store but loses every customer update race.
    struct AlwaysStaleRepository(InMemoryLedgerRepository);

    #[async_trait]
    impl LedgerRepository for AlwaysStaleRepository {
        async fn insert_customer(&self, customer: Customer) -> Result<()> {
            self.0.insert_customer(customer).await
        }
        async fn list_customers(&self, owner: &str) -> Result<Vec<Customer>> {
            self.0.list_customers(owner).await
        }
        async fn find_customer(&self, owner: &str, id: Uuid) -> Result<Option<Customer>> {
            self.0.find_customer(owner, id).await
        }
        async fn update_customer(
            &self,
            _owner: &str,
            _customer: Customer,
            _expected_version: u64,
        ) -> Result<Customer> {
            Err(DomainError::Conflict("Customer was modified concurrently".to_string()).into())
        }
        async fn delete_customer(&self, owner: &str, id: Uuid) -> Result<bool> {
            self.0.delete_customer(owner, id).await
        }
        async fn list_leases(&self, owner: &str, customer: Option<Uuid>) -> Result<Vec<Lease>> {
            self.0.list_leases(owner, customer).await
        }
        async fn find_lease(&self, owner: &str, id: Uuid) -> Result<Option<Lease>> {
            self.0.find_lease(owner, id).await
        }
        async fn list_payments(&self, owner: &str, customer: Option<Uuid>) -> Result<Vec<Payment>> {
            self.0.list_payments(owner, customer).await
        }
        async fn find_payment(&self, owner: &str, id: Uuid) -> Result<Option<Payment>> {
            self.0.find_payment(owner, id).await
        }
        async fn customer_snapshot(
            &self,
            owner: &str,
            id: Uuid,
        ) -> Result<Option<CustomerSnapshot>> {
            self.0.customer_snapshot(owner, id).await
        }
        async fn commit(&self, owner: &str, write: LedgerWrite) -> Result<Customer> {
            self.0.commit(owner, write).await
        }
    }

    fn form(name: &str) -> CustomerForm {
        CustomerForm {
            name: Some(name.to_string()),
            phone: Some("9333333333".to_string()),
            address: Some("Lal Kothi".to_string()),
            ..Default::default()
        }
    }

    fn photo() -> UploadedPhoto {
        UploadedPhoto {
            file_name: Some("aadhar.png".to_string()),
            content_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        }
    }

    fn lease_of(customer: Uuid, amount: Amount) -> CreateLease {
        CreateLease {
            customer,
            item_name: "Rice".to_string(),
            amount,
            date_of_lending: None,
            status: None,
            return_date: None,
            notes: None,
        }
    }

    fn payment_of(customer: Uuid, amount: Amount) -> CreatePayment {
        CreatePayment {
            customer,
            amount,
            payment_method: PaymentMethod::Cash,
            payment_date: None,
            status: None,
            transaction_id: None,
            notes: None,
        }
    }

    fn service() -> (
        Arc<InMemoryLedgerRepository>,
        Arc<RecordingPhotoStore>,
        CustomerService<InMemoryLedgerRepository, RecordingPhotoStore>,
    ) {
        let repo = Arc::new(InMemoryLedgerRepository::new());
        let photos = Arc::new(RecordingPhotoStore::default());
        let service = CustomerService::new(repo.clone(), photos.clone(), 5);
        (repo, photos, service)
    }

    #[tokio::test]
    async fn test_create_with_photo_records_path() {
        let (_, photos, service) = service();
        let customer = service
            .create_customer("owner-1", form("Kiran"), Some(photo()))
            .await
            .unwrap();
        assert_eq!(customer.aadhar_photo.as_deref(), Some("uploads/photo-1.png"));
        assert_eq!(customer.total_pending_amount, Decimal::ZERO);
        assert_eq!(photos.stored.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_form_does_not_store_photo() {
        let (_, photos, service) = service();
        let mut bad = form("Kiran");
        bad.address = None;
        assert!(service.create_customer("owner-1", bad, Some(photo())).await.is_err());
        assert!(photos.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_is_owner_scoped_newest_first() {
        let (_, _, service) = service();
        service.create_customer("owner-1", form("First"), None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        service.create_customer("owner-1", form("Second"), None).await.unwrap();
        service.create_customer("owner-2", form("Other"), None).await.unwrap();

        let names: Vec<String> = service
            .list_customers("owner-1")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn test_foreign_customer_is_not_found() {
        let (_, photos, service) = service();
        let customer = service.create_customer("owner-1", form("Kiran"), None).await.unwrap();

        let err = service.get_customer("owner-2", customer.id).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::NotFound(_))
        ));
        assert!(
            service
                .update_customer("owner-2", customer.id, form("Hijack"), Some(photo()))
                .await
                .is_err()
        );
        assert!(photos.stored.lock().unwrap().is_empty());
        assert!(service.delete_customer("owner-2", customer.id).await.is_err());
    }

    #[tokio::test]
    async fn test_update_preserves_balance_and_unspecified_fields() {
        let (repo, _, service) = service();
        let customer = service.create_customer("owner-1", form("Kiran"), None).await.unwrap();
        let ledger = LedgerService::new(repo.clone(), 5);
        ledger
            .create_lease(
                "owner-1",
                CreateLease {
                    customer: customer.id,
                    item_name: "Sugar".to_string(),
                    amount: Amount::from(120),
                    date_of_lending: None,
                    status: None,
                    return_date: None,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let updated = service
            .update_customer(
                "owner-1",
                customer.id,
                CustomerForm {
                    email: Some("kiran@example.com".to_string()),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Kiran");
        assert_eq!(updated.email.as_deref(), Some("kiran@example.com"));
        assert_eq!(updated.total_pending_amount, Decimal::from(120));
    }

    #[tokio::test]
    async fn test_statement_is_consistent() {
        let (repo, _, service) = service();
        let customer = service.create_customer("owner-1", form("Kiran"), None).await.unwrap();
        let ledger = LedgerService::new(repo.clone(), 5);
        for amount in [100u64, 250] {
            ledger
                .create_lease(
                    "owner-1",
                    CreateLease {
                        customer: customer.id,
                        item_name: "Dal".to_string(),
                        amount: Amount::from(amount),
                        date_of_lending: None,
                        status: None,
                        return_date: None,
                        notes: None,
                    },
                )
                .await
                .unwrap();
        }

        let statement = service.statement("owner-1", customer.id).await.unwrap();
        assert_eq!(statement.leases.len(), 2);
        assert_eq!(statement.computed_pending_amount, Decimal::from(350));
        assert!(statement.consistent);
    }

    #[tokio::test]
    async fn test_statement_reports_overflow_as_validation_error() {
        let (repo, _, service) = service();
        let customer = service.create_customer("owner-1", form("Kiran"), None).await.unwrap();
        let ledger = LedgerService::new(repo.clone(), 5);
        let huge = Amount::new(Decimal::from_i128_with_scale(
            70_000_000_000_000_000_000_000_000_000,
            0,
        ))
        .unwrap();

        // The running balance stays in range while the lease total does not.
        ledger.create_lease("owner-1", lease_of(customer.id, huge)).await.unwrap();
        ledger.record_payment("owner-1", payment_of(customer.id, huge)).await.unwrap();
        ledger.create_lease("owner-1", lease_of(customer.id, huge)).await.unwrap();

        let err = service.statement("owner-1", customer.id).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_statement_stays_consistent_during_concurrent_writes() {
        let (repo, _, service) = service();
        let customer = service.create_customer("owner-1", form("Kiran"), None).await.unwrap();
        let ledger = Arc::new(LedgerService::new(repo.clone(), 5));

        let writers: Vec<_> = (0..20)
            .map(|_| {
                let ledger = ledger.clone();
                let id = customer.id;
                tokio::spawn(async move {
                    ledger.create_lease("owner-1", lease_of(id, Amount::from(10))).await
                })
            })
            .collect();
        for _ in 0..20 {
            let statement = service.statement("owner-1", customer.id).await.unwrap();
            assert!(statement.consistent);
            tokio::task::yield_now().await;
        }
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let statement = service.statement("owner-1", customer.id).await.unwrap();
        assert_eq!(statement.leases.len(), 20);
        assert_eq!(statement.computed_pending_amount, Decimal::from(200));
        assert!(statement.consistent);
    }

    #[tokio::test]
    async fn test_failed_update_removes_newly_stored_photo() {
        let repo = Arc::new(AlwaysStaleRepository(InMemoryLedgerRepository::new()));
        let photos = Arc::new(RecordingPhotoStore::default());
        let service = CustomerService::new(repo.clone(), photos.clone(), 3);
        let customer = service.create_customer("owner-1", form("Kiran"), None).await.unwrap();

        let err = service
            .update_customer("owner-1", customer.id, form("Kiran K"), Some(photo()))
            .await
            .unwrap_err();

        assert!(DomainError::is_conflict(&err));
        assert_eq!(photos.stored.lock().unwrap().len(), 1);
        assert_eq!(
            *photos.removed.lock().unwrap(),
            vec!["uploads/photo-1.png".to_string()]
        );
        let stored = service.get_customer("owner-1", customer.id).await.unwrap();
        assert_eq!(stored.aadhar_photo, None);
    }

    #[tokio::test]
    async fn test_successful_update_keeps_photo() {
        let (_, photos, service) = service();
        let customer = service.create_customer("owner-1", form("Kiran"), None).await.unwrap();
        let updated = service
            .update_customer("owner-1", customer.id, form("Kiran"), Some(photo()))
            .await
            .unwrap();
        assert_eq!(updated.aadhar_photo.as_deref(), Some("uploads/photo-1.png"));
        assert!(photos.removed.lock().unwrap().is_empty());
    }
}
