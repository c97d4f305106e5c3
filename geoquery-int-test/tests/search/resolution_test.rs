#[cfg(test)]
mod resolution_tests {
    use geoquery::search::Command;
    use geoquery::tile::{mercator_domain, TileCoord};
    use geoquery::{BoundingBox, Geometry, OutputMode, SearchError, TargetKind};
    use geoquery_int_test::test_util::{cleanup, create_test_context, run_test};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_bounds_corners_are_exact() {
        run_test(
            create_test_context,
            |ctx| {
                let mut rng = StdRng::seed_from_u64(7);
                for _ in 0..200 {
                    let min_lat: f64 = rng.random_range(-90.0..90.0);
                    let min_lon: f64 = rng.random_range(-180.0..180.0);
                    let max_lat: f64 = rng.random_range(-90.0..90.0);
                    let max_lon: f64 = rng.random_range(-180.0..180.0);
                    let line = format!("fleet BOUNDS {} {} {} {}", min_lat, min_lon, max_lat, max_lon);
                    let d = ctx.engine().search_args(false, Command::Intersects, &args(&line))?;
                    assert_eq!(
                        d.target(),
                        Some(&Geometry::Rect(BoundingBox::new(min_lon, min_lat, max_lon, max_lat)))
                    );
                    assert_eq!(d.tile(), None);
                }
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_mvt_contains_tile_and_stays_in_domain() {
        run_test(
            create_test_context,
            |ctx| {
                let mut rng = StdRng::seed_from_u64(11);
                let domain = mercator_domain();
                for _ in 0..200 {
                    let z: u32 = rng.random_range(0..=12);
                    let n = 1u32 << z;
                    let x = rng.random_range(0..n);
                    let y = rng.random_range(0..n);
                    let line = format!("fleet MVT {} {} {}", x, y, z);
                    let d = ctx.engine().search_args(false, Command::Within, &args(&line))?;
                    let rect = d.target().map(Geometry::bounding_box).unwrap_or_default();
                    let tile = TileCoord::new(x, y, z)?.bounds();

                    assert!(d.is_mvt());
                    assert_eq!(d.tile(), Some(TileCoord { x, y, z }));
                    assert!(rect.contains(&tile));
                    assert!(domain.contains(&rect));
                    if x > 0 && y > 0 && x + 1 < n && y + 1 < n {
                        assert!(rect.strictly_contains(&tile));
                    }
                }
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_equal_bearings_always_fail() {
        run_test(
            create_test_context,
            |ctx| {
                let mut rng = StdRng::seed_from_u64(3);
                for _ in 0..100 {
                    let b: f64 = rng.random_range(-360.0..360.0);
                    let line = format!("INTERSECTS fleet SECTOR 33 -115 1000 {} {}", b, b);
                    let err = ctx.run(&line).unwrap_err();
                    assert!(matches!(err, SearchError::EqualBearings(_, _)));
                    assert!(err.is_semantic());
                }
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_nearby_radius_sentinel() {
        run_test(
            create_test_context,
            |ctx| {
                let d = ctx.engine().search_args(false, Command::Nearby, &args("fleet POINT 0 0"))?;
                assert!(d.nearby_circle().is_some_and(|c| c.is_unbounded()));

                let d =
                    ctx.engine().search_args(false, Command::Nearby, &args("fleet POINT 0 0 0"))?;
                let circle = d.nearby_circle().copied();
                assert!(circle.is_some_and(|c| !c.is_unbounded() && c.meters == 0.0));
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_sparse_requires_distance() {
        run_test(
            create_test_context,
            |ctx| {
                assert_eq!(
                    ctx.run("NEARBY fleet SPARSE 2 POINT 0 0").unwrap_err(),
                    SearchError::SparseWithoutDistance
                );
                assert!(ctx.reply("NEARBY fleet SPARSE 2 POINT 0 0 200000").is_ok());
                assert!(ctx.reply("INTERSECTS fleet SPARSE 2 CIRCLE 0 0 500").is_ok());
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_clip_composition() {
        run_test(
            create_test_context,
            |ctx| {
                let err = ctx
                    .run(r#"INTERSECTS fleet OBJECT {"type":"Point","coordinates":[0,0]} CLIPBY BOUNDS -1 -1 1 1"#)
                    .unwrap_err();
                assert_eq!(err, SearchError::ClipIncompatible("object".to_string()));

                let d = ctx.engine().search_args(
                    false,
                    Command::Intersects,
                    &args("fleet BOUNDS 0 0 10 10 CLIPBY BOUNDS 5 5 20 20"),
                )?;
                assert_eq!(
                    d.target().map(Geometry::bounding_box),
                    Some(BoundingBox::new(5.0, 5.0, 10.0, 10.0))
                );

                assert_eq!(
                    ctx.run("INTERSECTS fleet BOUNDS 0 0 1 1 CLIPBY GET zones square").unwrap_err(),
                    SearchError::CannotClipBy("get".to_string())
                );
                assert_eq!(
                    ctx.run("INTERSECTS fleet BOUNDS 0 0 1 1 LIMIT 5").unwrap_err(),
                    SearchError::InvalidNumberOfArguments
                );
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_implicit_bounds_heuristic() {
        run_test(
            create_test_context,
            |ctx| {
                let d = ctx.engine().search_args(
                    false,
                    Command::Within,
                    &args("fleet BOUNDS -1 -1 1 2"),
                )?;
                assert_eq!(d.kind(), Some(TargetKind::Bounds));
                assert_eq!(d.base().output, OutputMode::Objects);

                let d = ctx.engine().search_args(
                    false,
                    Command::Within,
                    &args("fleet BOUNDS BOUNDS -1 -1 1 2"),
                )?;
                assert_eq!(d.base().output, OutputMode::Bounds);

                assert_eq!(
                    ctx.run("NEARBY fleet BOUNDS 0 0").unwrap_err(),
                    SearchError::invalid_argument("0")
                );
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_unknown_and_unpermitted_kinds() {
        run_test(
            create_test_context,
            |ctx| {
                assert_eq!(
                    ctx.run("WITHIN fleet GEO 1 2").unwrap_err(),
                    SearchError::invalid_argument("GEO")
                );
                assert_eq!(
                    ctx.run("NEARBY fleet HASH 9q8yy").unwrap_err(),
                    SearchError::invalid_argument("HASH")
                );
                assert_eq!(
                    ctx.run("WITHIN fleet TILE 0 0 24").unwrap_err(),
                    SearchError::invalid_argument("24")
                );
                assert_eq!(
                    ctx.run("WITHIN fleet GET nowhere x").unwrap_err(),
                    SearchError::KeyNotFound
                );
                Ok(())
            },
            cleanup,
        )
    }
}
