use crate::commands::CommandResult;
use loadline_core::config::{AppConfig, LoadOptions};
use loadline_db::{connect_with_settings, migrations, SeedDataset};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = SeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = SeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result = if verification.is_complete() {
            Ok(seed_result)
        } else {
            let missing: Vec<String> =
                verification.missing.iter().map(|id| id.0.clone()).collect();
            let message = if missing.is_empty() {
                format!(
                    "seed verification found {} of {} expected loads",
                    verification.found, verification.expected
                )
            } else {
                format!("seed verification missing loads: {}", missing.join(", "))
            };
            Err(("seed_verification", message, 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => {
            let ids: Vec<&str> = seeded.loads_seeded.iter().map(|id| id.0.as_str()).collect();
            CommandResult::success(
                "seed",
                format!("demo load board seeded with {} loads: {}", ids.len(), ids.join(", ")),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}
