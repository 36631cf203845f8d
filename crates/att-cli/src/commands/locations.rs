//! Work location administration and registration.

use std::io::Write;

use anyhow::{Context, Result, bail};
use att_core::{Coordinate, Identity, SessionStore, WorkLocation};
use att_db::Database;
use att_engine::LocationRegistry;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::LocationsAction;
use crate::commands::util::write_json;

#[derive(Debug, Serialize)]
struct LocationRow {
    #[serde(flatten)]
    location: WorkLocation,
    registered: bool,
    verified: bool,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    registry: &LocationRegistry,
    identity: &Identity,
    action: &LocationsAction,
    now: DateTime<Utc>,
) -> Result<()> {
    match action {
        LocationsAction::Add {
            id,
            name,
            lat,
            lon,
            radius,
        } => {
            let location = WorkLocation::new(
                id.clone(),
                identity.org_id.clone(),
                name.as_str(),
                Coordinate::new(*lat, *lon)?,
                *radius,
            )?;
            db.upsert_work_location(&location)
                .context("failed to save work location")?;
            writeln!(
                writer,
                "Saved {} ({:.0} m around {:.6}, {:.6}).",
                location.id,
                location.radius_meters,
                location.coordinate.latitude,
                location.coordinate.longitude
            )?;
        }
        LocationsAction::List { json } => {
            let registrations = registry.list_registered(&*db, &identity.user_id)?;
            let rows: Vec<LocationRow> = db
                .list_work_locations(&identity.org_id)?
                .into_iter()
                .map(|location| {
                    let registration = registrations
                        .iter()
                        .find(|registration| registration.location_id == location.id);
                    LocationRow {
                        registered: registration.is_some(),
                        verified: registration.is_some_and(|r| r.verified),
                        location,
                    }
                })
                .collect();

            if *json {
                return write_json(writer, &rows);
            }
            if rows.is_empty() {
                writeln!(writer, "No work locations in {}.", identity.org_id)?;
                return Ok(());
            }
            for row in &rows {
                let marker = match (row.registered, row.verified) {
                    (true, true) => "registered",
                    (true, false) => "pending verification",
                    (false, _) => "not registered",
                };
                writeln!(
                    writer,
                    "{}  {} ({:.0} m): {marker}",
                    row.location.id, row.location.name, row.location.radius_meters
                )?;
            }
        }
        LocationsAction::Register { id, notes } => {
            let registration =
                registry.register_manual(db, &identity.user_id, id, notes.clone(), now)?;
            if registration.verified {
                writeln!(writer, "Already registered at {id}.")?;
            } else {
                writeln!(writer, "Requested registration at {id}; awaiting verification.")?;
            }
        }
        LocationsAction::Verify { id, user } => {
            let user = user.as_ref().unwrap_or(&identity.user_id);
            if !db.verify_registration(user, id)? {
                bail!("{user} is not registered at {id}");
            }
            writeln!(writer, "Verified {user} at {id}.")?;
        }
    }
    Ok(())
}
