//! CSV export of the fleet registry.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::fleet::ResourceStatus;

/// Column header for fleet CSV export.
const HEADER: &str = "ven_name,ven_id,registration_id,last_report,last_report_units,\
                       last_report_time,check_ins,connection_quality";

/// Exports a fleet listing to a CSV file at the given path.
///
/// Writes a header row followed by one row per VEN, in listing order.
///
/// # Arguments
///
/// * `fleet` - VENs annotated with connection quality
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(fleet: &[ResourceStatus], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(fleet, buf)
}

/// Writes a fleet listing as CSV to any writer.
///
/// Missing telemetry is written as empty fields.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(fleet: &[ResourceStatus], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for status in fleet {
        let r = &status.record;
        wtr.write_record(&[
            r.name.clone(),
            r.resource_id.clone(),
            r.registration_id.clone(),
            r.last_report_value.map(|v| v.to_string()).unwrap_or_default(),
            r.last_report_units.clone().unwrap_or_default(),
            r.last_report_time.map(|t| t.to_rfc3339()).unwrap_or_default(),
            r.check_in_history.len().to_string(),
            format!("{:.1}", status.connection_quality),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::fleet::ResourceRecord;

    fn status(name: &str, reported: bool) -> ResourceStatus {
        let mut record = ResourceRecord::new(name);
        if reported {
            let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
            record.apply_report(120.5, "voltage", at);
        }
        ResourceStatus {
            record,
            connection_quality: 0.0,
        }
    }

    #[test]
    fn header_and_row_per_ven() {
        let fleet = vec![status("ven_1", true), status("ven_2", false)];
        let mut out = Vec::new();
        write_csv(&fleet, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(
                "ven_name,ven_id,registration_id,last_report,last_report_units,\
                 last_report_time,check_ins,connection_quality"
            )
        );
        let first = lines.next().unwrap();
        assert!(first.starts_with("ven_1,"));
        assert!(first.contains(",120.5,voltage,2024-06-01T12:00:00+00:00,1,0.0"));
        let second = lines.next().unwrap();
        assert!(second.ends_with(",,,,0,0.0"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_fleet_writes_header_only() {
        let mut out = Vec::new();
        write_csv(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }
}
