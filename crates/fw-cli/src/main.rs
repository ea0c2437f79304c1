use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fw_gates::DEFAULT_GEOFENCE_RADIUS_M;
use fw_integrity::{violation_key, MonitorConfig, ViolationCounter};
use fw_roster::{RosterViews, DEFAULT_LEADERBOARD_LIMIT};
use fw_schemas::{DriverProfile, GeoPoint, Geofence, ShiftType, SystemClock};
use fw_shift::ShiftLifecycle;

#[derive(Parser)]
#[command(name = "fw")]
#[command(about = "Fleet workforce operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> local ...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Insert or refresh reference records
    Seed {
        #[command(subcommand)]
        cmd: SeedCmd,
    },

    /// Dashcam-obstruction streak counters
    Integrity {
        #[command(subcommand)]
        cmd: IntegrityCmd,
    },

    /// Print the roll call for one shift (JSON)
    RollCall {
        /// AM | PM | NIGHT
        #[arg(long = "shift-type")]
        shift_type: String,

        /// Shift date, YYYY-MM-DD
        #[arg(long)]
        date: String,
    },

    /// Print the revenue-per-hour leaderboard (JSON)
    Leaderboard {
        /// Shift date, YYYY-MM-DD
        #[arg(long)]
        date: String,

        /// Restrict to one shift type
        #[arg(long = "shift-type")]
        shift_type: Option<String>,

        #[arg(long, default_value_t = DEFAULT_LEADERBOARD_LIMIT)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations. Guardrail: refuses while any shift is clocked in,
    /// active or on break unless --yes is provided.
    Migrate {
        /// Acknowledge you are migrating a DB with shifts in progress.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum SeedCmd {
    /// Driver with current bond figures (centavos)
    Driver {
        #[arg(long)]
        id: String,

        #[arg(long)]
        name: String,

        #[arg(long = "bond-balance-cents")]
        bond_balance_cents: i64,

        #[arg(long = "bond-required-cents")]
        bond_required_cents: i64,
    },

    /// Circular clock-in / clock-out zone
    Geofence {
        #[arg(long)]
        id: String,

        #[arg(long)]
        name: String,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        #[arg(long = "radius-m", default_value_t = DEFAULT_GEOFENCE_RADIUS_M)]
        radius_m: f64,
    },
}

#[derive(Subcommand)]
enum IntegrityCmd {
    /// Current consecutive-violation count for a driver
    Count {
        #[arg(long)]
        driver: String,
    },

    /// Clear a driver's streak
    Reset {
        #[arg(long)]
        driver: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = fw_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = fw_db::status(&pool).await?;
                    println!("db_ok={} has_shifts_table={}", s.ok, s.has_shifts_table);
                }
                DbCmd::Migrate { yes } => {
                    let n = fw_db::count_live_shifts(&pool).await?;
                    if n > 0 && !yes {
                        bail!(
                            "REFUSING MIGRATE: detected {} shift(s) in CLOCKED_IN/ACTIVE/ON_BREAK. Re-run with: `fw db migrate --yes`",
                            n
                        );
                    }

                    fw_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = fw_config::load_layered_yaml(&path_refs)?;
            // Typed validation too, so a hash is never printed for a config
            // the daemon would refuse.
            fw_config::FleetSettings::from_loaded(&loaded)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Seed { cmd } => {
            let pool = fw_db::connect_from_env().await?;
            match cmd {
                SeedCmd::Driver {
                    id,
                    name,
                    bond_balance_cents,
                    bond_required_cents,
                } => {
                    if bond_balance_cents < 0 || bond_required_cents < 0 {
                        bail!("bond figures must not be negative");
                    }
                    fw_db::upsert_driver(
                        &pool,
                        &DriverProfile {
                            driver_id: id.clone(),
                            name,
                            bond_balance_cents,
                            bond_required_cents,
                        },
                    )
                    .await?;
                    println!("driver_upserted=true driver_id={}", id);
                }
                SeedCmd::Geofence {
                    id,
                    name,
                    lat,
                    lng,
                    radius_m,
                } => {
                    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                        bail!("coordinates out of range: lat={lat} lng={lng}");
                    }
                    if radius_m <= 0.0 {
                        bail!("radius must be positive (got {radius_m})");
                    }
                    fw_db::upsert_geofence(
                        &pool,
                        &Geofence {
                            geofence_id: id.clone(),
                            name,
                            center: GeoPoint::new(lat, lng),
                            radius_m,
                        },
                    )
                    .await?;
                    println!("geofence_upserted=true geofence_id={}", id);
                }
            }
        }

        Commands::Integrity { cmd } => {
            let url = std::env::var(fw_db::ENV_REDIS_URL)
                .with_context(|| format!("missing env var {}", fw_db::ENV_REDIS_URL))?;
            let counter = fw_db::RedisViolationCounter::new(&url)?;
            match cmd {
                IntegrityCmd::Count { driver } => {
                    let n = counter.count(&violation_key(&driver)).await?;
                    println!(
                        "driver_id={} violations={} threshold={}",
                        driver,
                        n,
                        MonitorConfig::standard().threshold_checks()
                    );
                }
                IntegrityCmd::Reset { driver } => {
                    counter.clear(&violation_key(&driver)).await?;
                    println!("reset=true driver_id={}", driver);
                }
            }
        }

        Commands::RollCall { shift_type, date } => {
            let shift_type = ShiftType::parse(&shift_type)?;
            let date = parse_date(&date)?;
            let roster = roster_from_env().await?;
            let view = roster.get_roll_call(shift_type, date).await?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }

        Commands::Leaderboard {
            date,
            shift_type,
            limit,
        } => {
            let shift_type = shift_type.as_deref().map(ShiftType::parse).transpose()?;
            let date = parse_date(&date)?;
            if limit == 0 {
                bail!("limit must be at least 1");
            }
            let roster = roster_from_env().await?;
            let entries = roster.get_leaderboard(date, shift_type, limit).await?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("date must be YYYY-MM-DD (got {raw:?})"))
}

async fn roster_from_env() -> Result<RosterViews> {
    let pool = fw_db::connect_from_env().await?;
    let store = Arc::new(fw_db::PgShiftStore::new(pool));
    Ok(RosterViews::new(ShiftLifecycle::new(store, Arc::new(SystemClock))))
}
