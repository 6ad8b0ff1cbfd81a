//! End-to-end suite for the batched bridge.

#[cfg(test)]
mod host_sim;

#[cfg(test)]
mod tests {
    use crate::host_sim::{HostSim, Reply};
    use bridge_queue::{
        ManualClock, MessageQueue, MethodTable, QueueConfig, SpyData, Value,
    };
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    const STORE: u32 = 0;
    const STORE_GET: u32 = 0;
    const STORE_LOG: u32 = 1;

    /// `Chain.start(n)` asks the host for `n`, then counts down one round trip
    /// at a time until zero.
    fn chain_module() -> Rc<dyn bridge_queue::CallableModule> {
        MethodTable::new()
            .method("start", |args| {
                let n = args.first().and_then(Value::as_u64).unwrap_or(0);
                request(n)?;
                Ok(Value::Undefined)
            })
            .into_module()
    }

    fn request(n: u64) -> anyhow::Result<()> {
        batched_bridge::bridge()?.enqueue_host_call(
            STORE,
            STORE_GET,
            vec![Value::from(n)],
            Some(Box::new(|reason: Vec<Value>| -> anyhow::Result<()> {
                batched_bridge::bridge()?.enqueue_host_call(STORE, STORE_LOG, reason, None, None)?;
                Ok(())
            })),
            Some(Box::new(move |_reply: Vec<Value>| -> anyhow::Result<()> {
                if n > 0 {
                    request(n - 1)?;
                }
                Ok(())
            })),
        )?;
        Ok(())
    }

    fn install(config: QueueConfig) -> Rc<MessageQueue> {
        batched_bridge::uninstall();
        let queue = batched_bridge::install(MessageQueue::new(config)).expect("install");
        queue.register_callable_module("Chain", chain_module());
        queue
    }

    #[test]
    fn round_trips_run_until_quiescent() {
        let queue = install(QueueConfig::development());
        let mut host = HostSim::new().reply(STORE, STORE_GET, Reply::Succeed);

        let first = batched_bridge::call_function_return_flushed_queue(
            "Chain",
            "start",
            vec![Value::from(3)],
        )
        .expect("start");
        let rounds = host.pump(first).expect("pump");

        assert_eq!(rounds, 4, "one round per request");
        let sent: Vec<_> = host
            .seen()
            .iter()
            .map(|call| call.params[0].as_u64())
            .collect();
        assert_eq!(sent, vec![Some(3), Some(2), Some(1), Some(0)]);
        assert_eq!(queue.pending_callbacks(), 0);
        assert_eq!(queue.next_call_id(), 4);
        batched_bridge::uninstall();
    }

    #[test]
    fn failure_callbacks_run_instead_of_success() {
        let queue = install(QueueConfig::production());
        let mut host = HostSim::new().reply(STORE, STORE_GET, Reply::Fail("offline".into()));

        let first = batched_bridge::call_function_return_flushed_queue(
            "Chain",
            "start",
            vec![Value::from(5)],
        )
        .expect("start");
        host.pump(first).expect("pump");

        let methods: Vec<_> = host.seen().iter().map(|call| call.method_id).collect();
        assert_eq!(methods, vec![STORE_GET, STORE_LOG]);
        assert_eq!(host.seen()[1].params, vec![Value::from("offline")]);
        assert_eq!(queue.pending_callbacks(), 0);
        batched_bridge::uninstall();
    }

    #[test]
    fn unanswered_calls_stay_pending() {
        let queue = install(QueueConfig::production());
        let mut host = HostSim::new();

        let first = batched_bridge::call_function_return_flushed_queue(
            "Chain",
            "start",
            vec![Value::from(1)],
        )
        .expect("start");
        host.pump(first).expect("pump");

        assert_eq!(host.seen().len(), 1);
        assert_eq!(queue.pending_callbacks(), 1);
        batched_bridge::uninstall();
    }

    #[test]
    fn batches_serialize_in_wire_shape() {
        let queue = MessageQueue::new(QueueConfig::production());
        queue
            .enqueue_host_call(4, 2, vec![Value::from("a"), Value::Null], None, None)
            .expect("enqueue");
        queue
            .enqueue_host_call(
                4,
                3,
                Vec::new(),
                None,
                Some(Box::new(|_args: Vec<Value>| -> anyhow::Result<()> { Ok(()) })),
            )
            .expect("enqueue");
        let batch = queue.drain().expect("drain");

        assert_eq!(
            serde_json::to_value(&batch).expect("serialize"),
            serde_json::json!([[4, 4], [2, 3], [["a", null], [3]], 0])
        );
    }

    #[test]
    fn auto_flushed_and_drained_batches_cover_every_call_in_order() {
        let clock = Rc::new(ManualClock::new());
        let flushed = Rc::new(RefCell::new(Vec::new()));
        let sink_batches = Rc::clone(&flushed);
        let queue = MessageQueue::builder()
            .config(QueueConfig::production())
            .clock(clock.clone())
            .flush_sink(move |batch: bridge_queue::FlushedQueue| {
                sink_batches.borrow_mut().push(batch)
            })
            .build();

        for method_id in 0..20u32 {
            queue
                .enqueue_host_call(1, method_id, Vec::new(), None, None)
                .expect("enqueue");
            clock.advance(Duration::from_millis(2));
        }
        let tail = queue.drain().expect("drain");

        let mut order: Vec<u32> = flushed
            .borrow()
            .iter()
            .flat_map(|batch| batch.method_ids().to_vec())
            .collect();
        order.extend(tail.iter().flat_map(|batch| batch.method_ids().to_vec()));
        assert_eq!(order, (0..20).collect::<Vec<_>>());
        assert!(
            flushed.borrow().len() > 1,
            "throttle should still flush periodically"
        );
        assert!(flushed.borrow().len() < 20, "throttle should batch calls");
    }

    #[test]
    fn spy_traces_a_full_round_trip() {
        let queue = install(QueueConfig::development());
        queue.create_debug_lookup(STORE, "Store", ["get", "log"]);
        let lines = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&lines);
        queue.install_spy(Some(Rc::new(move |data: &SpyData| {
            sink.borrow_mut().push(data.to_string())
        })));

        let mut host = HostSim::new().reply(STORE, STORE_GET, Reply::Succeed);
        let first = batched_bridge::call_function_return_flushed_queue(
            "Chain",
            "start",
            vec![Value::from(0)],
        )
        .expect("start");
        host.pump(first).expect("pump");

        assert_eq!(
            *lines.borrow(),
            vec![
                "host->script : Chain.start([0])".to_owned(),
                "script->host : Store.get([0,0,1])".to_owned(),
                "host->script : <callback for Store.get>([0])".to_owned(),
            ]
        );
        batched_bridge::uninstall();
    }
}
