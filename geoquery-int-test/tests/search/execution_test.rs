#[cfg(test)]
mod execution_tests {
    use geoquery::collection::{CandidateFilter, DistanceVisitor, ItemVisitor};
    use geoquery::{
        CommandOutcome, Deadline, Geometry, Item, MemoryCollection, Message, OutputFormat,
        OutputMode, SearchConfig, SearchError, SearchResult, SpatialCollection,
    };
    use geoquery_int_test::test_util::{
        cleanup, create_test_context, create_test_context_with, run_test,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    /// Wraps a collection and counts how often a traversal calls its visitor.
    struct VisitCounting {
        inner: MemoryCollection,
        visits: Arc<AtomicUsize>,
    }

    impl SpatialCollection for VisitCounting {
        fn count(&self) -> usize {
            self.inner.count()
        }

        fn get(&self, id: &str) -> Option<Arc<Item>> {
            self.inner.get(id)
        }

        fn nearby(
            &self,
            target: &Geometry,
            filter: &dyn CandidateFilter,
            deadline: &Deadline,
            visit: &mut DistanceVisitor<'_>,
        ) -> SearchResult<()> {
            self.inner.nearby(target, filter, deadline, &mut |item, dist| {
                self.visits.fetch_add(1, Ordering::SeqCst);
                visit(item, dist)
            })
        }

        fn within(
            &self,
            target: &Geometry,
            sparse: u8,
            filter: &dyn CandidateFilter,
            deadline: &Deadline,
            visit: &mut ItemVisitor<'_>,
        ) -> SearchResult<()> {
            self.inner.within(target, sparse, filter, deadline, &mut |item| {
                self.visits.fetch_add(1, Ordering::SeqCst);
                visit(item)
            })
        }

        fn intersects(
            &self,
            target: &Geometry,
            sparse: u8,
            filter: &dyn CandidateFilter,
            deadline: &Deadline,
            visit: &mut ItemVisitor<'_>,
        ) -> SearchResult<()> {
            self.inner.intersects(target, sparse, filter, deadline, &mut |item| {
                self.visits.fetch_add(1, Ordering::SeqCst);
                visit(item)
            })
        }

        fn search_values(
            &self,
            desc: bool,
            filter: &dyn CandidateFilter,
            deadline: &Deadline,
            visit: &mut ItemVisitor<'_>,
        ) -> SearchResult<()> {
            self.inner.search_values(desc, filter, deadline, &mut |item| {
                self.visits.fetch_add(1, Ordering::SeqCst);
                visit(item)
            })
        }

        fn search_values_range(
            &self,
            start: &str,
            end: &str,
            desc: bool,
            filter: &dyn CandidateFilter,
            deadline: &Deadline,
            visit: &mut ItemVisitor<'_>,
        ) -> SearchResult<()> {
            self.inner
                .search_values_range(start, end, desc, filter, deadline, &mut |item| {
                    self.visits.fetch_add(1, Ordering::SeqCst);
                    visit(item)
                })
        }
    }

    #[test]
    fn test_expired_deadline_aborts() {
        run_test(
            create_test_context,
            |ctx| {
                let past = Instant::now() - Duration::from_millis(10);
                let msg = Message::parse("NEARBY fleet POINT 0 0").with_deadline(Deadline::at(past));
                let err = ctx.engine().execute(&msg).unwrap_err();
                assert!(err.is_timeout());

                let msg = Message::parse("WITHIN zones BOUNDS -90 -180 90 180")
                    .with_deadline(Deadline::at(past));
                assert_eq!(ctx.engine().execute(&msg).unwrap_err(), SearchError::Timeout);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_default_timeout_from_config() {
        run_test(
            || create_test_context_with(SearchConfig::new().with_default_timeout(Some(Duration::ZERO))),
            |ctx| {
                assert_eq!(
                    ctx.run("NEARBY fleet POINT 0 0").unwrap_err(),
                    SearchError::Timeout
                );
                let msg = Message::parse("NEARBY fleet IDS POINT 0 0")
                    .with_deadline(Deadline::after(Duration::from_secs(60)));
                let reply = ctx.engine().execute(&msg)?.into_reply().expect("reply");
                assert_eq!(reply.ids(), vec!["p0", "p1", "p5"]);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_script_filter() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("NEARBY fleet WHEREEVAL min_field 2 speed 40 IDS POINT 0 0")?;
                assert_eq!(reply.ids(), vec!["p1", "p5"]);
                assert_eq!(ctx.scripts().compiled(), 1);
                assert_eq!(ctx.scripts().released(), 1);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_evaluator_fault_releases_script() {
        run_test(
            create_test_context,
            |ctx| {
                let err = ctx
                    .run("NEARBY fleet WHEREEVAL fault 0 POINT 0 0")
                    .unwrap_err();
                assert!(matches!(err, SearchError::Evaluator(_)));
                assert_eq!(ctx.scripts().compiled(), 1);
                assert_eq!(ctx.scripts().released(), 1);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_resolution_error_releases_script() {
        run_test(
            create_test_context,
            |ctx| {
                let err = ctx
                    .run("NEARBY fleet WHEREEVAL min_field 2 speed 40 BOGUS 0 0")
                    .unwrap_err();
                assert_eq!(err, SearchError::invalid_argument("BOGUS"));
                assert_eq!(ctx.scripts().compiled(), 1);
                assert_eq!(ctx.scripts().released(), 1);

                assert!(matches!(
                    ctx.run("NEARBY fleet WHEREEVAL nope 0 POINT 0 0"),
                    Err(SearchError::Evaluator(_))
                ));
                assert_eq!(ctx.scripts().compiled(), 1);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_unknown_command_and_missing_key() {
        run_test(
            create_test_context,
            |ctx| {
                assert_eq!(
                    ctx.run("SCAN fleet").unwrap_err(),
                    SearchError::invalid_argument("SCAN")
                );
                assert_eq!(
                    ctx.run("NEARBY").unwrap_err(),
                    SearchError::InvalidNumberOfArguments
                );
                let reply = ctx.reply("WITHIN nowhere COUNT BOUNDS 0 0 1 1")?;
                assert!(reply.ok);
                assert_eq!(reply.count, 0);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_reply_rendering() {
        run_test(
            create_test_context,
            |ctx| {
                let msg = Message::parse("INTERSECTS zones IDS BOUNDS 0 0 2 2")
                    .with_output(OutputFormat::Resp);
                let outcome = ctx.engine().execute(&msg)?;
                let reply = outcome.reply().expect("reply");
                assert_eq!(reply.format, OutputFormat::Resp);
                assert_eq!(reply.output, OutputMode::Ids);

                let json = ctx.reply("INTERSECTS zones IDS BOUNDS 0 0 2 2")?.to_json();
                assert_eq!(json["ok"], serde_json::json!(true));
                assert_eq!(json["ids"], serde_json::json!(["square"]));
                assert_eq!(json["count"], serde_json::json!(1));
                assert_eq!(json["cursor"], serde_json::json!(0));
                assert!(json["elapsed"].is_string());
                assert!(matches!(outcome, CommandOutcome::Reply(_)));
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_traversal_stops_when_sink_declines() {
        run_test(
            create_test_context,
            |ctx| {
                let visits = Arc::new(AtomicUsize::new(0));
                ctx.engine().set_collection(
                    "watched",
                    Arc::new(VisitCounting {
                        inner: ctx.fleet().clone(),
                        visits: visits.clone(),
                    }),
                );

                let reply = ctx.reply("NEARBY watched LIMIT 1 IDS POINT 0 0")?;
                assert_eq!(reply.ids(), vec!["p0"]);
                assert_eq!(visits.swap(0, Ordering::SeqCst), 1);

                let reply = ctx.reply("WITHIN watched LIMIT 1 IDS BOUNDS -1 -1 1 6")?;
                assert_eq!(reply.ids().len(), 1);
                assert_eq!(visits.swap(0, Ordering::SeqCst), 1);

                let err = ctx.run("NEARBY watched WHEREEVAL fault 0 POINT 0 0").unwrap_err();
                assert!(matches!(err, SearchError::Evaluator(_)));
                assert_eq!(visits.load(Ordering::SeqCst), 1);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_oversized_script_argument_count() {
        run_test(
            create_test_context,
            |ctx| {
                assert_eq!(
                    ctx.run("NEARBY fleet WHEREEVAL min_field 18446744073709551615 speed POINT 0 0")
                        .unwrap_err(),
                    SearchError::InvalidNumberOfArguments
                );
                assert_eq!(
                    ctx.run("SEARCH fruit WHEREIN kind 18446744073709551615 1").unwrap_err(),
                    SearchError::InvalidNumberOfArguments
                );
                assert_eq!(ctx.scripts().compiled(), 0);
                Ok(())
            },
            cleanup,
        )
    }
}
