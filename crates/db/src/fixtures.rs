use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use loadline_core::domain::load::{EquipmentType, Load, LoadId};

use crate::connection::DbPool;
use crate::repositories::{LoadRepository, RepositoryError, SqlLoadRepository};

/// Demo load board: ten active loads across common lanes, with pickup
/// dates rolled forward from the time of seeding so searches always find
/// bookable freight.
pub struct SeedDataset;

#[derive(Clone, Debug)]
pub struct SeedResult {
    pub loads_seeded: Vec<LoadId>,
}

#[derive(Clone, Debug)]
pub struct VerificationResult {
    pub expected: usize,
    pub found: usize,
    pub missing: Vec<LoadId>,
}

impl VerificationResult {
    pub fn is_complete(&self) -> bool {
        self.found == self.expected && self.missing.is_empty()
    }
}

impl SeedDataset {
    pub fn loads() -> Vec<Load> {
        let base = Utc::now() + Duration::days(1);
        let load = |id: &str,
                    origin: (&str, &str),
                    destination: (&str, &str),
                    pickup_offset_days: i64,
                    transit: Duration,
                    equipment: EquipmentType,
                    weight_lbs: u32,
                    miles: u32,
                    rate_per_mile: Decimal,
                    total_rate: Decimal,
                    commodity: &str,
                    special: Option<&str>,
                    broker: (&str, &str)| {
            let pickup = base + Duration::days(pickup_offset_days);
            Load {
                id: LoadId(id.to_string()),
                origin_city: origin.0.to_string(),
                origin_state: origin.1.to_string(),
                destination_city: destination.0.to_string(),
                destination_state: destination.1.to_string(),
                pickup_date: pickup,
                delivery_date: pickup + transit,
                equipment_type: equipment,
                weight_lbs,
                miles,
                rate_per_mile,
                total_rate,
                commodity: commodity.to_string(),
                special_requirements: special.map(str::to_string),
                broker_name: broker.0.to_string(),
                broker_mc: broker.1.to_string(),
                is_active: true,
            }
        };

        vec![
            load(
                "LOAD-001",
                ("Los Angeles", "CA"),
                ("Phoenix", "AZ"),
                0,
                Duration::days(1),
                EquipmentType::DryVan,
                45_000,
                370,
                Decimal::new(215, 2),
                Decimal::new(79_550, 2),
                "Electronics",
                Some("Temperature controlled"),
                ("ABC Logistics", "123456"),
            ),
            load(
                "LOAD-002",
                ("Chicago", "IL"),
                ("Atlanta", "GA"),
                1,
                Duration::days(1),
                EquipmentType::Refrigerated,
                42_000,
                720,
                Decimal::new(245, 2),
                Decimal::new(176_400, 2),
                "Food Products",
                Some("Keep frozen"),
                ("XYZ Freight", "789012"),
            ),
            load(
                "LOAD-003",
                ("Houston", "TX"),
                ("Denver", "CO"),
                2,
                Duration::days(1),
                EquipmentType::Flatbed,
                48_000,
                920,
                Decimal::new(280, 2),
                Decimal::new(257_600, 2),
                "Construction Materials",
                Some("Tarp required"),
                ("Southwest Transport", "345678"),
            ),
            load(
                "LOAD-004",
                ("Miami", "FL"),
                ("New York", "NY"),
                3,
                Duration::days(2),
                EquipmentType::DryVan,
                44_000,
                1280,
                Decimal::new(195, 2),
                Decimal::new(249_600, 2),
                "Retail Goods",
                Some("Appointment required"),
                ("East Coast Logistics", "901234"),
            ),
            load(
                "LOAD-005",
                ("Seattle", "WA"),
                ("Portland", "OR"),
                4,
                Duration::hours(6),
                EquipmentType::DryVan,
                38_000,
                175,
                Decimal::new(225, 2),
                Decimal::new(39_375, 2),
                "Consumer Electronics",
                Some("Liftgate required"),
                ("Pacific Freight", "567890"),
            ),
            load(
                "LOAD-006",
                ("Dallas", "TX"),
                ("Memphis", "TN"),
                5,
                Duration::days(1),
                EquipmentType::DryVan,
                41_000,
                470,
                Decimal::new(210, 2),
                Decimal::new(98_700, 2),
                "Auto Parts",
                Some("No drop and hook"),
                ("Central Freight", "111222"),
            ),
            load(
                "LOAD-007",
                ("Phoenix", "AZ"),
                ("Las Vegas", "NV"),
                6,
                Duration::days(1),
                EquipmentType::Flatbed,
                46_000,
                295,
                Decimal::new(260, 2),
                Decimal::new(76_700, 2),
                "Steel Beams",
                Some("Tarps required"),
                ("Desert Transport", "333444"),
            ),
            load(
                "LOAD-008",
                ("Atlanta", "GA"),
                ("Jacksonville", "FL"),
                7,
                Duration::days(1),
                EquipmentType::Refrigerated,
                39_000,
                350,
                Decimal::new(275, 2),
                Decimal::new(96_250, 2),
                "Fresh Produce",
                Some("Temperature 35-38F"),
                ("Southern Logistics", "555666"),
            ),
            load(
                "LOAD-009",
                ("San Francisco", "CA"),
                ("Sacramento", "CA"),
                8,
                Duration::hours(4),
                EquipmentType::DryVan,
                35_000,
                90,
                Decimal::new(280, 2),
                Decimal::new(25_200, 2),
                "Tech Equipment",
                Some("White glove service"),
                ("Bay Area Logistics", "777888"),
            ),
            load(
                "LOAD-010",
                ("Denver", "CO"),
                ("Salt Lake City", "UT"),
                9,
                Duration::days(1),
                EquipmentType::DryVan,
                43_000,
                525,
                Decimal::new(205, 2),
                Decimal::new(107_625, 2),
                "Sporting Goods",
                Some("Appointment required"),
                ("Mountain Freight", "999000"),
            ),
        ]
    }

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let repo = SqlLoadRepository::new(pool.clone());
        let loads = Self::loads();
        let mut loads_seeded = Vec::with_capacity(loads.len());

        for load in loads {
            let id = load.id.clone();
            repo.save(load).await?;
            loads_seeded.push(id);
        }

        Ok(SeedResult { loads_seeded })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let repo = SqlLoadRepository::new(pool.clone());
        let expected: Vec<LoadId> = Self::loads().into_iter().map(|load| load.id).collect();

        let mut missing = Vec::new();
        for id in &expected {
            if repo.find_by_id(id).await?.is_none() {
                missing.push(id.clone());
            }
        }

        Ok(VerificationResult {
            expected: expected.len(),
            found: expected.len() - missing.len(),
            missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use loadline_core::domain::load::{EquipmentType, LoadSearchCriteria};

    use super::SeedDataset;
    use crate::repositories::{LoadRepository, SqlLoadRepository};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn seed_is_idempotent_and_verifiable() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");

        let first = SeedDataset::load(&pool).await.expect("seed once");
        assert_eq!(first.loads_seeded.len(), 10);

        let second = SeedDataset::load(&pool).await.expect("seed twice");
        assert_eq!(second.loads_seeded.len(), 10);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM load")
            .fetch_one(&pool)
            .await
            .expect("count loads");
        assert_eq!(count, 10);

        let verification = SeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.is_complete());

        pool.close().await;
    }

    #[tokio::test]
    async fn seeded_board_covers_common_searches() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        SeedDataset::load(&pool).await.expect("seed");

        let repo = SqlLoadRepository::new(pool.clone());

        let dry_vans_from_ca = repo
            .search(
                &LoadSearchCriteria {
                    origin_state: Some("CA".to_string()),
                    equipment_type: Some(EquipmentType::DryVan),
                    ..LoadSearchCriteria::default()
                }
                .with_limit(10),
            )
            .await
            .expect("search dry vans from CA");
        assert_eq!(dry_vans_from_ca.len(), 2);

        let reefers = repo
            .search(
                &LoadSearchCriteria {
                    equipment_type: Some(EquipmentType::Refrigerated),
                    ..LoadSearchCriteria::default()
                }
                .with_limit(10),
            )
            .await
            .expect("search reefers");
        assert_eq!(reefers.len(), 2);

        pool.close().await;
    }
}
