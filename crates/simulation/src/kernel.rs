//! Simulation kernel.
//!
//! Owns virtual time, the event queue, the broker, and the registered
//! agents. Advances time by consuming the earliest pending event (ordered
//! by `(time, seq)`), delivering its payload, and admitting whatever
//! follow-on events the recipient schedules. Strictly single-threaded and
//! cooperative: one callback runs to completion before the next event is
//! dispatched.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace};
use types::{AgentId, Message, Payload, Timestamp, Topic};

use crate::agent::{Agent, EventScheduler};
use crate::broker::MessageBroker;
use crate::error::{AgentError, KernelError, ScheduleError};
use crate::event::{EventKind, EventQueue};

/// Counters reported by [`Kernel::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Events popped from the queue.
    pub events_processed: u64,
    /// Messages handed to `receive` callbacks.
    pub messages_delivered: u64,
    /// Wakeups handed to `wakeup` callbacks.
    pub wakeups_delivered: u64,
    /// Virtual time when the run stopped.
    pub final_time: Timestamp,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events ({} deliveries, {} wakeups), final time {}ms",
            self.events_processed, self.messages_delivered, self.wakeups_delivered, self.final_time
        )
    }
}

// The scheduling capability handed into callbacks. Borrows the queue and
// broker while the target agent is detached from its slot, so an agent can
// never reach itself (or any other agent) through it.
struct KernelCtx<'a> {
    now: Timestamp,
    queue: &'a mut EventQueue,
    broker: &'a mut MessageBroker,
}

impl KernelCtx<'_> {
    fn check_time(&self, at: Timestamp) -> Result<(), ScheduleError> {
        if at < self.now {
            return Err(ScheduleError::InvalidTime { at, now: self.now });
        }
        Ok(())
    }
}

impl EventScheduler for KernelCtx<'_> {
    fn now(&self) -> Timestamp {
        self.now
    }

    fn schedule_wakeup(&mut self, agent: AgentId, at: Timestamp) -> Result<(), ScheduleError> {
        self.check_time(at)?;
        self.queue.push(at, EventKind::Wakeup(agent));
        Ok(())
    }

    fn publish(
        &mut self,
        sender: AgentId,
        topic: Topic,
        payload: Payload,
        at: Timestamp,
    ) -> Result<(), ScheduleError> {
        self.check_time(at)?;
        let message = Message::new(sender, payload, at);
        self.queue.push(at, EventKind::Publish(topic, message));
        Ok(())
    }

    fn send_direct(
        &mut self,
        sender: AgentId,
        to: AgentId,
        payload: Payload,
        at: Timestamp,
    ) -> Result<(), ScheduleError> {
        self.check_time(at)?;
        let message = Message::new(sender, payload, at);
        self.queue.push(at, EventKind::Deliver(to, message));
        Ok(())
    }

    fn subscribe(&mut self, agent: AgentId, topic: Topic) {
        self.broker.subscribe(agent, topic);
    }

    fn unsubscribe(&mut self, agent: AgentId, topic: Topic) {
        self.broker.unsubscribe(agent, &topic);
    }
}

/// The simulation kernel.
pub struct Kernel {
    /// Current virtual time in milliseconds. Never rewinds.
    now: Timestamp,
    queue: EventQueue,
    broker: MessageBroker,
    /// Agent slots; a slot is `None` only while its agent is executing a
    /// callback (detached to avoid aliasing the kernel).
    agents: Vec<Option<Box<dyn Agent>>>,
    /// O(1) lookup: AgentId -> index in the agents vec.
    agent_index: HashMap<AgentId, usize>,
    /// Set by the first `run`; registration closes then.
    started: bool,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel {
    /// Create a kernel at virtual time zero.
    pub fn new() -> Self {
        Self {
            now: 0,
            queue: EventQueue::new(),
            broker: MessageBroker::new(),
            agents: Vec::new(),
            agent_index: HashMap::new(),
            started: false,
        }
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Number of registered agents.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Number of pending events.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Attach an agent to the simulation and invoke its `on_start` hook.
    ///
    /// May only be called before the first `run`. Returns the agent's id.
    pub fn register_agent(&mut self, mut agent: Box<dyn Agent>) -> Result<AgentId, KernelError> {
        if self.started {
            return Err(KernelError::RegistrationClosed);
        }
        let id = agent.id();
        if self.agent_index.contains_key(&id) {
            return Err(KernelError::DuplicateAgent(id));
        }
        debug!(agent = %id, name = agent.name(), "registering agent");

        let mut ctx = KernelCtx {
            now: self.now,
            queue: &mut self.queue,
            broker: &mut self.broker,
        };
        agent
            .on_start(&mut ctx)
            .map_err(|source| KernelError::AgentFailure {
                agent: id,
                time: self.now,
                event: "on_start".to_string(),
                source,
            })?;

        let idx = self.agents.len();
        self.agents.push(Some(agent));
        self.agent_index.insert(id, idx);
        Ok(id)
    }

    /// Schedule a wakeup from outside any callback (driver seeding).
    pub fn schedule_wakeup(&mut self, agent: AgentId, at: Timestamp) -> Result<(), KernelError> {
        if !self.agent_index.contains_key(&agent) {
            return Err(KernelError::UnknownAgent(agent));
        }
        if at < self.now {
            return Err(ScheduleError::InvalidTime { at, now: self.now }.into());
        }
        self.queue.push(at, EventKind::Wakeup(agent));
        Ok(())
    }

    /// Schedule a publish from outside any callback (driver seeding).
    pub fn schedule_send(
        &mut self,
        sender: AgentId,
        topic: Topic,
        payload: Payload,
        at: Timestamp,
    ) -> Result<(), KernelError> {
        if !self.agent_index.contains_key(&sender) {
            return Err(KernelError::UnknownAgent(sender));
        }
        if at < self.now {
            return Err(ScheduleError::InvalidTime { at, now: self.now }.into());
        }
        let message = Message::new(sender, payload, at);
        self.queue.push(at, EventKind::Publish(topic, message));
        Ok(())
    }

    /// Advance virtual time until the queue drains or the next event lies
    /// beyond `until`.
    ///
    /// An event beyond the deadline stays in the queue; a subsequent call
    /// resumes exactly where this one stopped. A failing agent callback
    /// aborts the run with the offending agent and event attached.
    pub fn run(&mut self, until: Option<Timestamp>) -> Result<RunSummary, KernelError> {
        self.started = true;
        debug!(
            agents = self.agents.len(),
            pending = self.queue.len(),
            ?until,
            "starting run"
        );

        let mut summary = RunSummary::default();

        while let Some(head_time) = self.queue.peek_time() {
            if let Some(limit) = until
                && head_time > limit
            {
                break;
            }

            let event = self.queue.pop().expect("queue was just peeked");
            debug_assert!(event.time >= self.now, "event queue rewound time");
            self.now = event.time;
            summary.events_processed += 1;

            match event.kind {
                EventKind::Wakeup(agent_id) => {
                    trace!(agent = %agent_id, time = event.time, seq = event.seq, "wakeup");
                    summary.wakeups_delivered += 1;
                    self.dispatch(agent_id, "wakeup", |agent, ctx| {
                        let now = ctx.now();
                        agent.wakeup(ctx, now)
                    })?;
                }
                EventKind::Deliver(agent_id, message) => {
                    trace!(agent = %agent_id, time = event.time, seq = event.seq, "deliver");
                    summary.messages_delivered += 1;
                    self.dispatch(agent_id, "message delivery", |agent, ctx| {
                        let now = ctx.now();
                        agent.receive(ctx, &message, now)
                    })?;
                }
                EventKind::Publish(topic, message) => {
                    // Same time, fresh seq: every subscriber sees the message
                    // at the publish timestamp, after all strictly-earlier
                    // events, in subscription-registration order.
                    trace!(
                        %topic,
                        time = event.time,
                        subscribers = self.broker.subscribers(&topic).len(),
                        "publish"
                    );
                    for &subscriber in self.broker.subscribers(&topic) {
                        self.queue
                            .push(event.time, EventKind::Deliver(subscriber, message.clone()));
                    }
                }
            }
        }

        summary.final_time = self.now;
        debug!(%summary, "run stopped");
        Ok(summary)
    }

    // Detach the agent from its slot, run the callback with a scheduling
    // context, and reattach. The slot is `None` for exactly the duration of
    // the callback.
    fn dispatch<F>(&mut self, agent_id: AgentId, event: &str, f: F) -> Result<(), KernelError>
    where
        F: FnOnce(&mut dyn Agent, &mut dyn EventScheduler) -> Result<(), AgentError>,
    {
        let idx = *self
            .agent_index
            .get(&agent_id)
            .ok_or(KernelError::UnknownAgent(agent_id))?;

        let mut agent = self.agents[idx].take().expect("agent slot occupied");
        let mut ctx = KernelCtx {
            now: self.now,
            queue: &mut self.queue,
            broker: &mut self.broker,
        };
        let result = f(agent.as_mut(), &mut ctx);
        self.agents[idx] = Some(agent);

        result.map_err(|source| KernelError::AgentFailure {
            agent: agent_id,
            time: self.now,
            event: event.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    /// Records every callback into a shared log; optionally subscribes to
    /// topics at start.
    struct Recorder {
        id: AgentId,
        topics: Vec<Topic>,
        log: Log,
    }

    impl Recorder {
        fn new(id: u64, log: Log) -> Self {
            Self {
                id: AgentId(id),
                topics: Vec::new(),
                log,
            }
        }

        fn subscribed(mut self, topic: &str) -> Self {
            self.topics.push(topic.to_string());
            self
        }
    }

    impl Agent for Recorder {
        fn id(&self) -> AgentId {
            self.id
        }

        fn on_start(&mut self, api: &mut dyn EventScheduler) -> Result<(), AgentError> {
            for topic in self.topics.drain(..) {
                api.subscribe(self.id, topic);
            }
            Ok(())
        }

        fn wakeup(&mut self, _api: &mut dyn EventScheduler, now: Timestamp) -> Result<(), AgentError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{} wakeup@{now}", self.id));
            Ok(())
        }

        fn receive(
            &mut self,
            _api: &mut dyn EventScheduler,
            message: &Message,
            now: Timestamp,
        ) -> Result<(), AgentError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{} recv@{now} from {}", self.id, message.sender));
            Ok(())
        }
    }

    fn ping() -> Payload {
        Payload::BookUpdate {
            symbol: "SIM".to_string(),
            top: types::TopOfBook::default(),
        }
    }

    #[test]
    fn test_wakeups_dispatch_in_time_order() {
        let log = new_log();
        let mut kernel = Kernel::new();
        kernel
            .register_agent(Box::new(Recorder::new(1, log.clone())))
            .unwrap();
        kernel
            .register_agent(Box::new(Recorder::new(2, log.clone())))
            .unwrap();

        kernel.schedule_wakeup(AgentId(2), 30).unwrap();
        kernel.schedule_wakeup(AgentId(1), 10).unwrap();
        kernel.schedule_wakeup(AgentId(2), 20).unwrap();

        let summary = kernel.run(None).unwrap();

        assert_eq!(
            entries(&log),
            vec!["Agent#1 wakeup@10", "Agent#2 wakeup@20", "Agent#2 wakeup@30"]
        );
        assert_eq!(summary.events_processed, 3);
        assert_eq!(summary.wakeups_delivered, 3);
        assert_eq!(summary.final_time, 30);
    }

    #[test]
    fn test_equal_time_dispatches_in_schedule_order() {
        let log = new_log();
        let mut kernel = Kernel::new();
        for id in 1..=3 {
            kernel
                .register_agent(Box::new(Recorder::new(id, log.clone())))
                .unwrap();
        }

        kernel.schedule_wakeup(AgentId(2), 5).unwrap();
        kernel.schedule_wakeup(AgentId(3), 5).unwrap();
        kernel.schedule_wakeup(AgentId(1), 5).unwrap();

        kernel.run(None).unwrap();

        assert_eq!(
            entries(&log),
            vec!["Agent#2 wakeup@5", "Agent#3 wakeup@5", "Agent#1 wakeup@5"]
        );
    }

    #[test]
    fn test_publish_fans_out_in_subscription_order() {
        // Agents A, B, C subscribe to X in that order at t=0; D publishes
        // at t=10; deliveries land at A, B, C in order, all at t=10.
        let log = new_log();
        let mut kernel = Kernel::new();
        for id in [1, 2, 3] {
            kernel
                .register_agent(Box::new(Recorder::new(id, log.clone()).subscribed("X")))
                .unwrap();
        }
        kernel
            .register_agent(Box::new(Recorder::new(4, log.clone())))
            .unwrap();

        kernel
            .schedule_send(AgentId(4), "X".to_string(), ping(), 10)
            .unwrap();

        let summary = kernel.run(None).unwrap();

        assert_eq!(
            entries(&log),
            vec![
                "Agent#1 recv@10 from Agent#4",
                "Agent#2 recv@10 from Agent#4",
                "Agent#3 recv@10 from Agent#4",
            ]
        );
        // One publish event plus three synthesized deliveries.
        assert_eq!(summary.events_processed, 4);
        assert_eq!(summary.messages_delivered, 3);
    }

    #[test]
    fn test_publish_orders_after_earlier_events_at_same_time() {
        let log = new_log();
        let mut kernel = Kernel::new();
        kernel
            .register_agent(Box::new(Recorder::new(1, log.clone()).subscribed("X")))
            .unwrap();
        kernel
            .register_agent(Box::new(Recorder::new(2, log.clone())))
            .unwrap();

        // The wakeup is scheduled before the publish at the same time, so
        // it dispatches first; the synthesized delivery comes last.
        kernel.schedule_wakeup(AgentId(1), 10).unwrap();
        kernel
            .schedule_send(AgentId(2), "X".to_string(), ping(), 10)
            .unwrap();

        kernel.run(None).unwrap();

        assert_eq!(
            entries(&log),
            vec!["Agent#1 wakeup@10", "Agent#1 recv@10 from Agent#2"]
        );
    }

    #[test]
    fn test_publish_without_subscribers_delivers_nothing() {
        let mut kernel = Kernel::new();
        kernel
            .register_agent(Box::new(Recorder::new(1, new_log())))
            .unwrap();

        kernel
            .schedule_send(AgentId(1), "empty".to_string(), ping(), 5)
            .unwrap();

        let summary = kernel.run(None).unwrap();
        assert_eq!(summary.events_processed, 1);
        assert_eq!(summary.messages_delivered, 0);
    }

    #[test]
    fn test_unsubscribed_agent_stops_receiving() {
        struct Unsubscriber {
            id: AgentId,
            log: Log,
        }

        impl Agent for Unsubscriber {
            fn id(&self) -> AgentId {
                self.id
            }

            fn on_start(&mut self, api: &mut dyn EventScheduler) -> Result<(), AgentError> {
                api.subscribe(self.id, "X".to_string());
                Ok(())
            }

            fn receive(
                &mut self,
                api: &mut dyn EventScheduler,
                _message: &Message,
                now: Timestamp,
            ) -> Result<(), AgentError> {
                self.log.lock().unwrap().push(format!("recv@{now}"));
                // Unsubscribe after the first delivery.
                api.unsubscribe(self.id, "X".to_string());
                Ok(())
            }
        }

        let log = new_log();
        let mut kernel = Kernel::new();
        kernel
            .register_agent(Box::new(Unsubscriber {
                id: AgentId(1),
                log: log.clone(),
            }))
            .unwrap();
        kernel
            .register_agent(Box::new(Recorder::new(2, new_log())))
            .unwrap();

        kernel
            .schedule_send(AgentId(2), "X".to_string(), ping(), 5)
            .unwrap();
        kernel
            .schedule_send(AgentId(2), "X".to_string(), ping(), 6)
            .unwrap();

        kernel.run(None).unwrap();
        assert_eq!(entries(&log), vec!["recv@5"]);
    }

    #[test]
    fn test_reentrant_wakeup_at_current_time() {
        // An agent scheduling a wakeup at t=now re-enters strictly after
        // the current callback completes, in the same virtual instant.
        struct Chain {
            id: AgentId,
            remaining: u32,
            log: Log,
        }

        impl Agent for Chain {
            fn id(&self) -> AgentId {
                self.id
            }

            fn wakeup(
                &mut self,
                api: &mut dyn EventScheduler,
                now: Timestamp,
            ) -> Result<(), AgentError> {
                self.log.lock().unwrap().push(format!("enter@{now}"));
                if self.remaining > 0 {
                    self.remaining -= 1;
                    api.schedule_wakeup(self.id, now)?;
                }
                self.log.lock().unwrap().push(format!("exit@{now}"));
                Ok(())
            }

            fn receive(
                &mut self,
                _api: &mut dyn EventScheduler,
                _message: &Message,
                _now: Timestamp,
            ) -> Result<(), AgentError> {
                Ok(())
            }
        }

        let log = new_log();
        let mut kernel = Kernel::new();
        kernel
            .register_agent(Box::new(Chain {
                id: AgentId(1),
                remaining: 2,
                log: log.clone(),
            }))
            .unwrap();
        kernel.schedule_wakeup(AgentId(1), 5).unwrap();

        let summary = kernel.run(None).unwrap();

        // Each re-entry begins only after the previous callback exited.
        assert_eq!(
            entries(&log),
            vec!["enter@5", "exit@5", "enter@5", "exit@5", "enter@5", "exit@5"]
        );
        assert_eq!(summary.final_time, 5);
    }

    #[test]
    fn test_schedule_into_past_is_invalid() {
        let mut kernel = Kernel::new();
        kernel
            .register_agent(Box::new(Recorder::new(1, new_log())))
            .unwrap();
        kernel.schedule_wakeup(AgentId(1), 10).unwrap();
        kernel.run(None).unwrap();

        assert_eq!(kernel.now(), 10);
        assert_eq!(
            kernel.schedule_wakeup(AgentId(1), 5),
            Err(KernelError::Schedule(ScheduleError::InvalidTime {
                at: 5,
                now: 10
            }))
        );
    }

    #[test]
    fn test_callback_scheduling_into_past_aborts_run() {
        struct BadScheduler {
            id: AgentId,
        }

        impl Agent for BadScheduler {
            fn id(&self) -> AgentId {
                self.id
            }

            fn wakeup(
                &mut self,
                api: &mut dyn EventScheduler,
                now: Timestamp,
            ) -> Result<(), AgentError> {
                // now is 10 here; scheduling at 3 must fail and propagate.
                api.schedule_wakeup(self.id, now - 7)?;
                Ok(())
            }

            fn receive(
                &mut self,
                _api: &mut dyn EventScheduler,
                _message: &Message,
                _now: Timestamp,
            ) -> Result<(), AgentError> {
                Ok(())
            }
        }

        let mut kernel = Kernel::new();
        kernel
            .register_agent(Box::new(BadScheduler { id: AgentId(1) }))
            .unwrap();
        kernel.schedule_wakeup(AgentId(1), 10).unwrap();

        let err = kernel.run(None).unwrap_err();
        match err {
            KernelError::AgentFailure { agent, time, event, .. } => {
                assert_eq!(agent, AgentId(1));
                assert_eq!(time, 10);
                assert_eq!(event, "wakeup");
            }
            other => panic!("expected AgentFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_agent_rejected() {
        let mut kernel = Kernel::new();
        assert_eq!(
            kernel.schedule_wakeup(AgentId(42), 0),
            Err(KernelError::UnknownAgent(AgentId(42)))
        );
        assert_eq!(
            kernel.schedule_send(AgentId(42), "X".to_string(), ping(), 0),
            Err(KernelError::UnknownAgent(AgentId(42)))
        );
    }

    #[test]
    fn test_duplicate_agent_rejected() {
        let mut kernel = Kernel::new();
        kernel
            .register_agent(Box::new(Recorder::new(1, new_log())))
            .unwrap();
        let err = kernel
            .register_agent(Box::new(Recorder::new(1, new_log())))
            .unwrap_err();
        assert_eq!(err, KernelError::DuplicateAgent(AgentId(1)));
    }

    #[test]
    fn test_registration_closes_after_run() {
        let mut kernel = Kernel::new();
        kernel
            .register_agent(Box::new(Recorder::new(1, new_log())))
            .unwrap();
        kernel.run(None).unwrap();

        let err = kernel
            .register_agent(Box::new(Recorder::new(2, new_log())))
            .unwrap_err();
        assert_eq!(err, KernelError::RegistrationClosed);
    }

    #[test]
    fn test_run_until_leaves_future_events_queued() {
        let log = new_log();
        let mut kernel = Kernel::new();
        kernel
            .register_agent(Box::new(Recorder::new(1, log.clone())))
            .unwrap();
        kernel.schedule_wakeup(AgentId(1), 5).unwrap();
        kernel.schedule_wakeup(AgentId(1), 15).unwrap();

        let first = kernel.run(Some(10)).unwrap();
        assert_eq!(first.events_processed, 1);
        assert_eq!(first.final_time, 5);
        assert_eq!(kernel.pending_events(), 1);

        // Resuming picks up the deferred event exactly once.
        let second = kernel.run(Some(20)).unwrap();
        assert_eq!(second.events_processed, 1);
        assert_eq!(second.final_time, 15);
        assert_eq!(entries(&log), vec!["Agent#1 wakeup@5", "Agent#1 wakeup@15"]);
    }

    #[test]
    fn test_failing_agent_halts_run() {
        struct Failing {
            id: AgentId,
        }

        impl Agent for Failing {
            fn id(&self) -> AgentId {
                self.id
            }

            fn wakeup(
                &mut self,
                _api: &mut dyn EventScheduler,
                _now: Timestamp,
            ) -> Result<(), AgentError> {
                Err(AgentError::new("strategy blew up"))
            }

            fn receive(
                &mut self,
                _api: &mut dyn EventScheduler,
                _message: &Message,
                _now: Timestamp,
            ) -> Result<(), AgentError> {
                Ok(())
            }
        }

        let log = new_log();
        let mut kernel = Kernel::new();
        kernel
            .register_agent(Box::new(Failing { id: AgentId(1) }))
            .unwrap();
        kernel
            .register_agent(Box::new(Recorder::new(2, log.clone())))
            .unwrap();

        kernel.schedule_wakeup(AgentId(1), 5).unwrap();
        kernel.schedule_wakeup(AgentId(2), 6).unwrap();

        let err = kernel.run(None).unwrap_err();
        assert!(matches!(err, KernelError::AgentFailure { agent, .. } if agent == AgentId(1)));
        // The run halted: the later wakeup was never dispatched.
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn test_identical_schedules_replay_identically() {
        fn run_once() -> (Vec<String>, RunSummary) {
            let log = new_log();
            let mut kernel = Kernel::new();
            for id in [1, 2, 3] {
                kernel
                    .register_agent(Box::new(Recorder::new(id, log.clone()).subscribed("X")))
                    .unwrap();
            }
            kernel
                .register_agent(Box::new(Recorder::new(4, log.clone())))
                .unwrap();

            kernel.schedule_wakeup(AgentId(2), 3).unwrap();
            kernel
                .schedule_send(AgentId(4), "X".to_string(), ping(), 3)
                .unwrap();
            kernel.schedule_wakeup(AgentId(1), 7).unwrap();

            let summary = kernel.run(None).unwrap();
            (entries(&log), summary)
        }

        let (trace_a, summary_a) = run_once();
        let (trace_b, summary_b) = run_once();
        assert_eq!(trace_a, trace_b);
        assert_eq!(summary_a, summary_b);
    }
}
