#[cfg(test)]
mod fence_tests {
    use geoquery::search::DetectEvent;
    use geoquery::{Command, SearchError, TargetKind};
    use geoquery_int_test::test_util::{cleanup, create_test_context, run_test};

    #[test]
    fn test_roam_goes_live() {
        run_test(
            create_test_context,
            |ctx| {
                let fence = ctx.fence("NEARBY fleet FENCE ROAM fleet truck-1 500")?;
                let roam = fence.roam().expect("roam descriptor");
                assert!(roam.on);
                assert_eq!(roam.key, "fleet");
                assert_eq!(roam.id, "truck-1");
                assert_eq!(roam.meters, 500.0);
                assert!(!roam.pattern);
                assert_eq!(roam.scan, None);
                assert_eq!(fence.descriptor().kind(), Some(TargetKind::Roam));
                assert!(fence.descriptor().target().is_none());
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_roam_pattern_and_scan() {
        run_test(
            create_test_context,
            |ctx| {
                let fence = ctx.fence("NEARBY fleet FENCE ROAM fleet truck* 100 SCAN bus*")?;
                let roam = fence.roam().expect("roam descriptor");
                assert!(roam.pattern);
                assert_eq!(roam.scan.as_deref(), Some("bus*"));

                assert_eq!(
                    ctx.run("NEARBY fleet FENCE ROAM fleet truck* 100 extra").unwrap_err(),
                    SearchError::invalid_argument("extra")
                );
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_roam_requires_fence() {
        run_test(
            create_test_context,
            |ctx| {
                assert_eq!(
                    ctx.run("NEARBY fleet ROAM fleet truck-1 500").unwrap_err(),
                    SearchError::invalid_argument("ROAM")
                );
                assert_eq!(
                    ctx.run("WITHIN fleet FENCE ROAM fleet truck-1 500").unwrap_err(),
                    SearchError::invalid_argument("ROAM")
                );
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_detect_fence() {
        run_test(
            create_test_context,
            |ctx| {
                let fence =
                    ctx.fence("WITHIN zones FENCE DETECT enter,exit COMMANDS set BOUNDS 0 0 2 2")?;
                let descriptor = fence.descriptor();
                assert_eq!(descriptor.command(), Command::Within);
                assert!(descriptor.is_fence());
                let detect = descriptor.base().detect.as_ref().expect("detect set");
                assert!(detect.contains(&DetectEvent::Enter));
                assert!(detect.contains(&DetectEvent::Exit));
                assert!(!detect.contains(&DetectEvent::Inside));
                assert!(descriptor.target().is_some());

                assert!(matches!(
                    ctx.run("WITHIN zones DETECT enter BOUNDS 0 0 2 2"),
                    Err(SearchError::Semantic(_))
                ));
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_fence_from_registration_path() {
        run_test(
            create_test_context,
            |ctx| {
                let args: Vec<String> = ["fleet", "POINT", "0", "0", "1000"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                let descriptor = ctx.engine().search_args(true, Command::Nearby, &args)?;
                assert!(descriptor.is_fence());
                assert_eq!(descriptor.nearby_circle().map(|c| c.meters), Some(1000.0));
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_fence_owns_script_resources() {
        run_test(
            create_test_context,
            |ctx| {
                let fence = ctx.fence("NEARBY fleet FENCE WHEREEVAL min_field 2 speed 40 POINT 0 0 1000")?;
                assert_eq!(ctx.scripts().compiled(), 1);
                assert_eq!(ctx.scripts().released(), 0);
                let descriptor = fence.into_descriptor();
                assert!(descriptor.base().using_scripts());
                drop(descriptor);
                assert_eq!(ctx.scripts().released(), 1);
                Ok(())
            },
            cleanup,
        )
    }
}
