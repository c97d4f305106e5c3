#[cfg(test)]
mod nearby_tests {
    use geoquery::search::ResultValue;
    use geoquery::{Geometry, Item, MemoryCollection};
    use geoquery_int_test::test_util::{cleanup, create_test_context, run_test, scatter_points};
    use std::sync::Arc;

    #[test]
    fn test_radius_scan_with_distance() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("NEARBY fleet DISTANCE POINT 0 0 150000")?;
                assert_eq!(reply.ids(), vec!["p0", "p1"]);
                let d0 = reply.items[0].distance.unwrap_or(f64::NAN);
                let d1 = reply.items[1].distance.unwrap_or(f64::NAN);
                assert!(d0.abs() < 1e-6, "expected ~0, got {}", d0);
                assert!((d1 - 111_195.0).abs() < 1.0, "expected ~111195, got {}", d1);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_distance_only_when_requested() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("NEARBY fleet POINT 0 0 150000")?;
                assert!(reply.items.iter().all(|i| i.distance.is_none()));
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_nearest_first_without_radius() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("NEARBY fleet LIMIT 2 IDS POINT 0 4")?;
                assert_eq!(reply.ids(), vec!["p5", "p1"]);
                assert_eq!(reply.cursor, 2);

                let reply = ctx.reply("NEARBY fleet CURSOR 2 LIMIT 2 IDS POINT 0 4")?;
                assert_eq!(reply.ids(), vec!["p0"]);
                assert_eq!(reply.cursor, 0);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_zero_radius_does_not_exclude() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("NEARBY fleet IDS POINT 0 0 0")?;
                assert_eq!(reply.ids(), vec!["p0", "p1", "p5"]);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_match_filters_ids() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("NEARBY fleet MATCH p[01] IDS POINT 0 5")?;
                assert_eq!(reply.ids(), vec!["p1", "p0"]);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_where_filters_fields() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("NEARBY fleet WHERE speed 20 +inf POINT 0 0")?;
                assert_eq!(reply.ids(), vec!["p1", "p5"]);
                let reply = ctx.reply("NEARBY fleet WHEREIN speed 2 10 90 NOFIELDS POINT 0 0")?;
                assert_eq!(reply.ids(), vec!["p0", "p5"]);
                assert!(reply.items.iter().all(|i| i.fields.is_none()));
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_clipped_radius_scan() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("NEARBY fleet IDS POINT 0 0 700000")?;
                assert_eq!(reply.ids(), vec!["p0", "p1", "p5"]);
                let reply = ctx.reply("NEARBY fleet IDS POINT 0 0 700000 CLIPBY BOUNDS -1 -1 1 0.5")?;
                assert_eq!(reply.ids(), vec!["p0"]);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_sparse_radius_scan() {
        run_test(
            create_test_context,
            |ctx| {
                let dense = MemoryCollection::new();
                scatter_points(&dense, "d", 400, (-0.5, -0.5, 0.5, 0.5), 42);
                ctx.engine().set_collection("dense", Arc::new(dense));

                let reply = ctx.reply("NEARBY dense SPARSE 1 DISTANCE POINT 0 0 100000")?;
                assert!(!reply.items.is_empty());
                assert!(reply.items.len() <= 4);
                assert!(reply.items.iter().all(|i| i.distance.is_some()));
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_points_output() {
        run_test(
            create_test_context,
            |ctx| {
                ctx.fleet().set(Item::geometry("sq", Geometry::rect(2.0, 2.0, 4.0, 4.0)));
                let reply = ctx.reply("NEARBY fleet MATCH sq POINTS POINT 3 3")?;
                assert_eq!(reply.ids(), vec!["sq"]);
                match &reply.items[0].value {
                    ResultValue::Point(c) => {
                        assert_eq!((c.x, c.y), (3.0, 3.0));
                    }
                    other => panic!("unexpected value {:?}", other),
                }
                let json = reply.to_json();
                assert_eq!(json["points"][0]["point"]["lat"], serde_json::json!(3.0));
                Ok(())
            },
            cleanup,
        )
    }
}
