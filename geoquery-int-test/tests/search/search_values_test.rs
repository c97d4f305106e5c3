#[cfg(test)]
mod search_values_tests {
    use geoquery::collection::{CandidateFilter, DistanceVisitor, ItemVisitor};
    use geoquery::{
        Deadline, Geometry, Item, MemoryCollection, SearchError, SearchResult, SpatialCollection,
    };
    use geoquery_int_test::test_util::{cleanup, create_test_context, run_test};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Wraps a collection and counts value traversals.
    struct CountingCollection {
        inner: MemoryCollection,
        scans: Arc<AtomicUsize>,
    }

    impl SpatialCollection for CountingCollection {
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
            self.inner.nearby(target, filter, deadline, visit)
        }

        fn within(
            &self,
            target: &Geometry,
            sparse: u8,
            filter: &dyn CandidateFilter,
            deadline: &Deadline,
            visit: &mut ItemVisitor<'_>,
        ) -> SearchResult<()> {
            self.inner.within(target, sparse, filter, deadline, visit)
        }

        fn intersects(
            &self,
            target: &Geometry,
            sparse: u8,
            filter: &dyn CandidateFilter,
            deadline: &Deadline,
            visit: &mut ItemVisitor<'_>,
        ) -> SearchResult<()> {
            self.inner.intersects(target, sparse, filter, deadline, visit)
        }

        fn search_values(
            &self,
            desc: bool,
            filter: &dyn CandidateFilter,
            deadline: &Deadline,
            visit: &mut ItemVisitor<'_>,
        ) -> SearchResult<()> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            self.inner.search_values(desc, filter, deadline, visit)
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
            self.scans.fetch_add(1, Ordering::SeqCst);
            self.inner
                .search_values_range(start, end, desc, filter, deadline, visit)
        }
    }

    #[test]
    fn test_sorted_scan_both_directions() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("SEARCH fruit IDS")?;
                assert_eq!(reply.ids(), vec!["f1", "f2", "f3", "f4", "f5"]);
                let reply = ctx.reply("SEARCH fruit DESC IDS")?;
                assert_eq!(reply.ids(), vec!["f5", "f4", "f3", "f2", "f1"]);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_prefix_range_scan() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("SEARCH fruit MATCH b* IDS")?;
                assert_eq!(reply.ids(), vec!["f3", "f4"]);
                let reply = ctx.reply("SEARCH fruit DESC MATCH b* IDS")?;
                assert_eq!(reply.ids(), vec!["f4", "f3"]);
                let reply = ctx.reply("SEARCH fruit MATCH ap* MATCH ch* IDS")?;
                assert_eq!(reply.ids(), vec!["f1", "f2", "f5"]);
                let reply = ctx.reply("SEARCH fruit MATCH banana IDS")?;
                assert_eq!(reply.ids(), vec!["f3"]);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_full_scan_without_prefix() {
        run_test(
            create_test_context,
            |ctx| {
                let reply = ctx.reply("SEARCH fruit MATCH *rr* IDS")?;
                assert_eq!(reply.ids(), vec!["f4", "f5"]);
                let reply = ctx.reply("SEARCH fruit MATCH b* MATCH *y IDS")?;
                assert_eq!(reply.ids(), vec!["f3", "f4", "f5"]);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_count_short_circuit() {
        run_test(
            create_test_context,
            |ctx| {
                let scans = Arc::new(AtomicUsize::new(0));
                ctx.engine().set_collection(
                    "counted",
                    Arc::new(CountingCollection {
                        inner: ctx.fruit().clone(),
                        scans: scans.clone(),
                    }),
                );

                assert_eq!(ctx.reply("SEARCH counted COUNT")?.count, 5);
                assert_eq!(ctx.reply("SEARCH counted CURSOR 2 COUNT")?.count, 3);
                assert_eq!(ctx.reply("SEARCH counted CURSOR 10 COUNT")?.count, 0);
                assert_eq!(ctx.reply("SEARCH counted MATCH * COUNT")?.count, 5);
                assert_eq!(scans.load(Ordering::SeqCst), 0);

                assert_eq!(ctx.reply("SEARCH counted MATCH a* COUNT")?.count, 2);
                assert_eq!(scans.load(Ordering::SeqCst), 1);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_pagination() {
        run_test(
            create_test_context,
            |ctx| {
                let first = ctx.reply("SEARCH fruit LIMIT 2 IDS")?;
                assert_eq!(first.ids(), vec!["f1", "f2"]);
                assert_eq!(first.cursor, 2);
                let next = ctx.reply(&format!("SEARCH fruit CURSOR {} LIMIT 2 IDS", first.cursor))?;
                assert_eq!(next.ids(), vec!["f3", "f4"]);
                let last = ctx.reply(&format!("SEARCH fruit CURSOR {} LIMIT 2 IDS", next.cursor))?;
                assert_eq!(last.ids(), vec!["f5"]);
                assert_eq!(last.cursor, 0);
                Ok(())
            },
            cleanup,
        )
    }

    #[test]
    fn test_search_grammar() {
        run_test(
            create_test_context,
            |ctx| {
                assert_eq!(
                    ctx.run("SEARCH fruit IDS extra").unwrap_err(),
                    SearchError::InvalidNumberOfArguments
                );
                assert_eq!(
                    ctx.run("SEARCH fruit FENCE").unwrap_err(),
                    SearchError::invalid_argument("FENCE")
                );
                let json = ctx.reply("SEARCH fruit MATCH apple")?.to_json();
                assert_eq!(json["ok"], serde_json::json!(true));
                assert_eq!(json["objects"][0]["object"], serde_json::json!("apple"));
                Ok(())
            },
            cleanup,
        )
    }
}
