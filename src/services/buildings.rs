use diesel::prelude::*;
use diesel::PgConnection;
use log::info;

use crate::db::models as dbm;
use crate::error::{FacilityError, FacilityResult};
use crate::models::facility::{Building, NewBuilding};
use crate::models::normalize::{optional_text, required_text};
use crate::schema;

pub fn create_building(conn: &mut PgConnection, input: &NewBuilding) -> FacilityResult<Building> {
    use schema::buildings::dsl as B;

    let new_row = dbm::NewBuildingRow {
        name: required_text("building name", input.name.as_deref())?,
        description: optional_text(input.description.as_deref()),
    };
    let row: dbm::BuildingRow = conn
        .transaction(|conn| {
            diesel::insert_into(B::buildings)
                .values(&new_row)
                .returning(dbm::BuildingRow::as_returning())
                .get_result(conn)
        })
        .map_err(|e| FacilityError::from_write("building", e))?;
    info!("Created building {} ({})", row.id, row.name);
    Ok(row.into())
}

/// All buildings ordered by name.
pub fn list_buildings(conn: &mut PgConnection) -> FacilityResult<Vec<Building>> {
    use schema::buildings::dsl as B;

    let rows: Vec<dbm::BuildingRow> = B::buildings
        .select(dbm::BuildingRow::as_select())
        .order((B::name.asc(), B::id.asc()))
        .load(conn)?;
    Ok(rows.into_iter().map(Building::from).collect())
}

pub fn get_building(conn: &mut PgConnection, id: i64) -> FacilityResult<Building> {
    use schema::buildings::dsl as B;

    B::buildings
        .find(id)
        .select(dbm::BuildingRow::as_select())
        .first(conn)
        .optional()?
        .map(Building::from)
        .ok_or(FacilityError::NotFound { entity: "building", id })
}

pub(crate) fn ensure_building_exists(conn: &mut PgConnection, id: i64) -> FacilityResult<()> {
    use schema::buildings::dsl as B;

    let exists: bool = diesel::select(diesel::dsl::exists(B::buildings.find(id))).get_result(conn)?;
    if exists {
        Ok(())
    } else {
        Err(FacilityError::validation(format!("building {id} does not exist")))
    }
}

/// The description is the only mutable attribute of a building.
pub fn update_building_description(
    conn: &mut PgConnection,
    id: i64,
    description: Option<&str>,
) -> FacilityResult<Building> {
    use schema::buildings::dsl as B;

    diesel::update(B::buildings.find(id))
        .set(B::description.eq(optional_text(description)))
        .returning(dbm::BuildingRow::as_returning())
        .get_result(conn)
        .optional()
        .map_err(|e| FacilityError::from_write("building", e))?
        .map(Building::from)
        .ok_or(FacilityError::NotFound { entity: "building", id })
}

/// Refused while any room still belongs to the building.
pub fn delete_building(conn: &mut PgConnection, id: i64) -> FacilityResult<()> {
    use schema::buildings::dsl as B;
    use schema::rooms::dsl as R;

    conn.transaction(|conn| {
        let owned: i64 = R::rooms.filter(R::building_id.eq(id)).count().get_result(conn)?;
        if owned > 0 {
            return Err(FacilityError::conflict(format!(
                "building {id} still owns {owned} room(s)"
            )));
        }
        let deleted = diesel::delete(B::buildings.find(id))
            .execute(conn)
            .map_err(|e| FacilityError::from_write("building", e))?;
        if deleted == 0 {
            return Err(FacilityError::NotFound { entity: "building", id });
        }
        info!("Deleted building {}", id);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::models::facility::NewRoom;
    use crate::services::rooms::create_room;

    fn building(name: &str) -> NewBuilding {
        NewBuilding {
            name: Some(name.into()),
            description: None,
        }
    }

    #[test]
    fn create_list_and_get() {
        let Some(mut conn) = test_connection() else { return };

        let b = create_building(&mut conn, &building("Zeta Wing")).unwrap();
        let a = create_building(&mut conn, &building("Alpha Wing")).unwrap();

        let listed = list_buildings(&mut conn).unwrap();
        let pos_a = listed.iter().position(|x| x.id == a.id).unwrap();
        let pos_b = listed.iter().position(|x| x.id == b.id).unwrap();
        assert!(pos_a < pos_b);

        assert_eq!(get_building(&mut conn, a.id).unwrap().name, "Alpha Wing");
    }

    #[test]
    fn blank_and_duplicate_names_are_rejected() {
        let Some(mut conn) = test_connection() else { return };

        assert!(matches!(
            create_building(&mut conn, &building("  ")),
            Err(FacilityError::Validation(_))
        ));
        create_building(&mut conn, &building("Garden House")).unwrap();
        assert!(matches!(
            create_building(&mut conn, &building("Garden House")),
            Err(FacilityError::Conflict(_))
        ));
    }

    #[test]
    fn missing_building_is_not_found() {
        let Some(mut conn) = test_connection() else { return };

        assert!(matches!(
            get_building(&mut conn, -1),
            Err(FacilityError::NotFound { entity: "building", id: -1 })
        ));
        assert!(matches!(
            update_building_description(&mut conn, -1, Some("x")),
            Err(FacilityError::NotFound { .. })
        ));
        assert!(matches!(delete_building(&mut conn, -1), Err(FacilityError::NotFound { .. })));
    }

    #[test]
    fn description_can_be_changed_and_cleared() {
        let Some(mut conn) = test_connection() else { return };

        let b = create_building(&mut conn, &building("Pool House")).unwrap();
        let updated = update_building_description(&mut conn, b.id, Some("By the pool")).unwrap();
        assert_eq!(updated.description.as_deref(), Some("By the pool"));
        let cleared = update_building_description(&mut conn, b.id, None).unwrap();
        assert_eq!(cleared.description, None);
    }

    #[test]
    fn delete_refused_while_rooms_exist() {
        let Some(mut conn) = test_connection() else { return };

        let b = create_building(&mut conn, &building("East Tower")).unwrap();
        create_room(
            &mut conn,
            &NewRoom {
                code: Some("E-1".into()),
                building_id: Some(b.id),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(matches!(delete_building(&mut conn, b.id), Err(FacilityError::Conflict(_))));
        assert!(get_building(&mut conn, b.id).is_ok());
    }

    #[test]
    fn empty_building_can_be_deleted() {
        let Some(mut conn) = test_connection() else { return };

        let b = create_building(&mut conn, &building("Shed")).unwrap();
        delete_building(&mut conn, b.id).unwrap();
        assert!(matches!(get_building(&mut conn, b.id), Err(FacilityError::NotFound { .. })));
    }
}
