use anyhow::Result;
use rusqlite::Connection;

use shamba_types::models::{County, SubCounty, Ward};

use super::OptionalExt;
use crate::Database;

/// Outcome of validating a county / sub-county / ward triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationCheck {
    Valid,
    UnknownCounty,
    SubCountyOutsideCounty,
    WardOutsideSubCounty,
}

impl LocationCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Valid => "location is valid",
            Self::UnknownCounty => "Unknown county",
            Self::SubCountyOutsideCounty => "Sub-county does not belong to the selected county",
            Self::WardOutsideSubCounty => "Ward does not belong to the selected sub-county",
        }
    }
}

impl Database {
    pub fn list_counties(&self) -> Result<Vec<County>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, code, name FROM counties ORDER BY name")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(County {
                        id: row.get(0)?,
                        code: row.get(1)?,
                        name: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_sub_counties(&self, county_id: i64) -> Result<Vec<SubCounty>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, county_id, name FROM sub_counties WHERE county_id = ?1 ORDER BY name",
            )?;
            let rows = stmt
                .query_map([county_id], |row| {
                    Ok(SubCounty {
                        id: row.get(0)?,
                        county_id: row.get(1)?,
                        name: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_wards(&self, sub_county_id: i64) -> Result<Vec<Ward>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sub_county_id, name FROM wards WHERE sub_county_id = ?1 ORDER BY name",
            )?;
            let rows = stmt
                .query_map([sub_county_id], |row| {
                    Ok(Ward {
                        id: row.get(0)?,
                        sub_county_id: row.get(1)?,
                        name: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn check_location(
        &self,
        county_id: Option<i64>,
        sub_county_id: Option<i64>,
        ward_id: Option<i64>,
    ) -> Result<LocationCheck> {
        self.with_conn(|conn| check_location(conn, county_id, sub_county_id, ward_id))
    }
}

fn check_location(
    conn: &Connection,
    county_id: Option<i64>,
    sub_county_id: Option<i64>,
    ward_id: Option<i64>,
) -> Result<LocationCheck> {
    if let Some(county_id) = county_id {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM counties WHERE id = ?1)",
            [county_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Ok(LocationCheck::UnknownCounty);
        }
    }

    if let Some(sub_county_id) = sub_county_id {
        let parent: Option<i64> = conn
            .query_row(
                "SELECT county_id FROM sub_counties WHERE id = ?1",
                [sub_county_id],
                |row| row.get(0),
            )
            .optional()?;
        if county_id.is_none() || parent != county_id {
            return Ok(LocationCheck::SubCountyOutsideCounty);
        }
    }

    if let Some(ward_id) = ward_id {
        let parent: Option<i64> = conn
            .query_row(
                "SELECT sub_county_id FROM wards WHERE id = ?1",
                [ward_id],
                |row| row.get(0),
            )
            .optional()?;
        if sub_county_id.is_none() || parent != sub_county_id {
            return Ok(LocationCheck::WardOutsideSubCounty);
        }
    }

    Ok(LocationCheck::Valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counties_sorted_by_name() {
        let db = Database::open_in_memory().unwrap();
        let counties = db.list_counties().unwrap();
        assert_eq!(counties.len(), 47);
        assert_eq!(counties[0].name, "Baringo");
        assert!(counties.windows(2).all(|w| w[0].name <= w[1].name));
    }

    #[test]
    fn hierarchy_lookups() {
        let db = Database::open_in_memory().unwrap();
        let subs = db.list_sub_counties(32).unwrap();
        let names: Vec<_> = subs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Naivasha", "Nakuru Town East", "Njoro"]);

        let wards = db.list_wards(6).unwrap();
        assert_eq!(wards.len(), 2);
        assert!(db.list_wards(999).unwrap().is_empty());
    }

    #[test]
    fn location_consistency() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.check_location(Some(47), Some(1), Some(2)).unwrap(), LocationCheck::Valid);
        assert_eq!(db.check_location(None, None, None).unwrap(), LocationCheck::Valid);
        assert_eq!(db.check_location(Some(99), None, None).unwrap(), LocationCheck::UnknownCounty);
        // Naivasha is in Nakuru, not Nairobi
        assert_eq!(
            db.check_location(Some(47), Some(6), None).unwrap(),
            LocationCheck::SubCountyOutsideCounty
        );
        // Githurai is in Kasarani, not Westlands
        assert_eq!(
            db.check_location(Some(47), Some(1), Some(3)).unwrap(),
            LocationCheck::WardOutsideSubCounty
        );
        assert_eq!(
            db.check_location(Some(47), None, Some(1)).unwrap(),
            LocationCheck::WardOutsideSubCounty
        );
    }
}
