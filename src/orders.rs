use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::error::{PawFinderError, Result};
use crate::models::{NewOrder, Order, OrderStatus, PaymentMethod};

/// JSON-file order log. Every read-modify-write cycle holds `lock`.
pub struct OrderStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl OrderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate, price and append an order. Write failures are logged and the
    /// order is still returned; an existing file that cannot be read is moved
    /// aside first so earlier orders are never overwritten.
    pub async fn create(&self, new: NewOrder) -> Result<Order> {
        let order = build_order(new)?;

        let _guard = self.lock.lock().await;
        let mut orders = match self.read_all().await {
            Ok(orders) => orders,
            Err(e) => {
                tracing::error!("Order file {} unreadable: {}", self.path.display(), e);
                self.quarantine().await?;
                Vec::new()
            }
        };
        orders.push(order.clone());
        if let Err(e) = self.write_all(&orders).await {
            tracing::error!(order_id = %order.id, "Failed to persist order to {}: {}", self.path.display(), e);
        } else {
            tracing::info!(order_id = %order.id, total = order.total, "Order saved");
        }
        Ok(order)
    }

    pub async fn list(&self) -> Vec<Order> {
        let _guard = self.lock.lock().await;
        self.read_all().await.unwrap_or_else(|e| {
            tracing::warn!("Could not load orders from {}: {}", self.path.display(), e);
            Vec::new()
        })
    }

    /// Missing file is an empty log; anything else that fails is an error
    async fn read_all(&self) -> Result<Vec<Order>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PawFinderError::Persistence(format!("read failed: {e}"))),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| PawFinderError::Persistence(format!("unparseable order file: {e}")))
    }

    /// Rename an unreadable order file to `<path>.corrupt-<unix millis>`
    async fn quarantine(&self) -> Result<PathBuf> {
        let mut backup = self.path.clone().into_os_string();
        backup.push(format!(".corrupt-{}", chrono::Utc::now().timestamp_millis()));
        let backup = PathBuf::from(backup);
        tokio::fs::rename(&self.path, &backup).await.map_err(|e| {
            PawFinderError::Persistence(format!(
                "cannot move unreadable order file {} aside: {e}",
                self.path.display()
            ))
        })?;
        tracing::warn!("Moved unreadable order file to {}", backup.display());
        Ok(backup)
    }

    /// Write to a sibling temp file, then rename over the target
    async fn write_all(&self, orders: &[Order]) -> Result<()> {
        let json = serde_json::to_vec_pretty(orders)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PawFinderError::Persistence(format!("rename failed: {e}")))
    }
}

fn build_order(new: NewOrder) -> Result<Order> {
    if new.user.name.trim().is_empty() || new.user.address.trim().is_empty() {
        return Err(PawFinderError::ClientInput(
            "User name and address are required".to_string(),
        ));
    }
    let payment_method: PaymentMethod = new
        .payment_method
        .parse()
        .map_err(PawFinderError::ClientInput)?;

    if let Some(item) = new
        .items
        .iter()
        .find(|item| !item.qty.is_finite() || !item.price.is_finite())
    {
        return Err(PawFinderError::ClientInput(format!(
            "Item {} has a non-finite qty or price",
            item.name.as_deref().or(item.id.as_deref()).unwrap_or("?")
        )));
    }
    let total: f64 = new.items.iter().map(|item| item.subtotal()).sum();
    if !total.is_finite() {
        return Err(PawFinderError::ClientInput(
            "Order total is out of range".to_string(),
        ));
    }

    Ok(Order {
        id: uuid::Uuid::new_v4(),
        user: new.user,
        items: new.items,
        payment_method,
        notes: new.notes,
        total,
        status: OrderStatus::from(payment_method),
        created_at: chrono::Utc::now().timestamp(),
    })
}
