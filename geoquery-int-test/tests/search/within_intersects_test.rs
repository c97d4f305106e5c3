#[cfg(test)]
mod within_intersects_tests {
    use geoquery::search::ResultValue;
    use geoquery::{BoundingBox, Geometry, MemoryCollection, SpatialCollection};
    use geoquery_int_test::test_util::{cleanup, create_test_context, run_test, scatter_points};
    use std::sync::Arc;

    #[test]
    fn test_within_bounds() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("WITHIN fleet IDS BOUNDS -1 -1 1 2")?;
                assert_eq!(reply.ids(), vec!["p0", "p1"]);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_within_reference_object() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("WITHIN fleet IDS GET zones square")?;
                assert_eq!(reply.ids(), vec!["p0", "p1"]);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_intersects_point_in_polygon() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("INTERSECTS zones IDS POINT 0.5 0.5")?;
                assert_eq!(reply.ids(), vec!["square"]);
                let reply = ctx.reply("INTERSECTS zones IDS POINT 10.5 11")?;
                assert_eq!(reply.ids(), vec!["triangle"]);
                let reply = ctx.reply("WITHIN zones IDS BOUNDS 9 9 13 13")?;
                assert_eq!(reply.ids(), vec!["triangle"]);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_intersects_with_circle_and_sector() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("INTERSECTS fleet IDS CIRCLE 0 0 120000")?;
                assert_eq!(reply.ids(), vec!["p0", "p1"]);
                // a quarter centered on due east only reaches p1
                let reply = ctx.reply("INTERSECTS fleet IDS SECTOR 0 0.5 100000 45 135")?;
                assert_eq!(reply.ids(), vec!["p1"]);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_intersects_clip_output() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("INTERSECTS zones CLIP BOUNDS 0.5 0.5 2 2")?;
                assert_eq!(reply.ids(), vec!["square"]);
                let bbox = match &reply.items[0].value {
                    ResultValue::Object(g) => g.bounding_box(),
                    other => panic!("unexpected value {:?}", other),
                };
                assert_eq!(bbox, BoundingBox::new(0.5, 0.5, 1.0, 1.0));
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_tile_and_hash_targets() {
        run_test(
            create_test_context,
            |ctx| {
                // zoom 1 tile (1, 0) is the north-east quadrant
                let reply = ctx.reply("INTERSECTS zones IDS TILE 1 0 1")?;
                assert_eq!(reply.ids(), vec!["square", "triangle"]);
                let reply = ctx.reply("INTERSECTS zones IDS QUADKEY 1")?;
                assert_eq!(reply.ids(), vec!["square", "triangle"]);
                let reply = ctx.reply("INTERSECTS zones IDS HASH s00")?;
                assert_eq!(reply.ids(), vec!["square"]);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_mvt_reply_carries_tile() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("WITHIN zones IDS MVT 1 0 1")?;
                assert!(reply.tile.is_some());
                let json = reply.to_json();
                assert_eq!(json["tile"]["z"], serde_json::json!(1));
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_random_within_matches_brute_force() {
        run_test(
            create_test_context,
            |ctx| {
                let cloud = MemoryCollection::new();
                scatter_points(&cloud, "c", 1000, (-10.0, -10.0, 10.0, 10.0), 99);
                ctx.engine().set_collection("cloud", Arc::new(cloud.clone()));

                let area = BoundingBox::new(-3.0, -2.0, 4.0, 5.0);
                let reply = ctx.reply("WITHIN cloud COUNT BOUNDS -2 -3 5 4")?;

                let mut expected = 0u64;
                for i in 0..1000 {
                    let item = cloud.get(&format!("c{}", i));
                    let center = item.as_ref().and_then(|it| it.geo()).map(Geometry::center);
                    if center.is_some_and(|c| area.contains_point(c.x, c.y)) {
                        expected += 1;
                    }
                }
                assert_eq!(reply.count, expected);
                assert!(expected > 0);
                Ok(())
            },
            cleanup,
        )
    }
}
