use std::sync::{Arc, Mutex};

use chrono::Utc;
use core_matching::{
	EventBuffer, EventStorage, EventWriter, EventWriterConfig, IngressQueue, MatchingEngine,
	MemoryEventStorage, MemoryOrderJournal, OrderJournal,
	engine::EngineConfig,
	event::MatchingEvent,
	types::{EngineRequest, OrderCommand},
};
use core_sdk::types::{OrderType, Side, StockTxId};

fn submit(sender: &core_matching::queue::QueueSender, command: OrderCommand) {
	let (respond_to, rx) = tokio::sync::oneshot::channel();
	sender.try_enqueue(EngineRequest { command, respond_to }).unwrap();
	rx.blocking_recv().unwrap().unwrap();
}

fn new_order(stock_id: &str, user_id: &str, side: Side, price: u64, qty: u64) -> OrderCommand {
	OrderCommand::New {
		stock_tx_id: StockTxId::new(),
		stock_id: stock_id.to_string(),
		user_id: user_id.to_string(),
		side,
		order_type: OrderType::Limit,
		quantity: qty,
		price: Some(price),
		created_at: Utc::now(),
	}
}

#[test]
fn test_crash_recovery_with_event_replay() {
	// Phase 1: create initial state and process some orders.
	let journal: Box<dyn OrderJournal> = Box::new(MemoryOrderJournal::new());
	let journal = Arc::new(Mutex::new(journal));

	let ingress_queue = IngressQueue::new(100);
	let (queue_sender, queue_receiver) = ingress_queue.split();

	let event_buffer = EventBuffer::new(100);
	let (event_producer, event_consumer) = event_buffer.split();

	let event_storage = Box::new(MemoryEventStorage::new());

	let _event_writer = EventWriter::start(
		event_consumer,
		event_storage,
		EventWriterConfig {
			batch_size: 10,
			batch_timeout_ms: 100,
			verbose_logging: true,
		},
	);

	let engine_config = EngineConfig {
		stock_id: "ACME".to_string(),
		verbose_logging: true,
	};

	let matching_engine = MatchingEngine::start(
		engine_config.clone(),
		queue_receiver,
		event_producer,
		journal.clone(),
		Vec::new(),
	);

	submit(&queue_sender, new_order("ACME", "buyer", Side::Buy, 50000, 10));
	submit(&queue_sender, new_order("ACME", "seller", Side::Sell, 49000, 5));

	std::thread::sleep(std::time::Duration::from_millis(300));

	// Create snapshot
	let snapshot = matching_engine.create_snapshot().unwrap();
	assert!(snapshot.metadata.size_bytes > 0);
	assert!(snapshot.metadata.event_seq > 0);

	// Phase 2: simulate a crash.
	drop(matching_engine);
	drop(_event_writer);

	std::thread::sleep(std::time::Duration::from_millis(100));

	// Phase 3: start a fresh engine and restore from the snapshot.
	let new_ingress_queue = IngressQueue::new(100);
	let (_new_queue_sender, new_queue_receiver) = new_ingress_queue.split();

	let new_event_buffer = EventBuffer::new(100);
	let (new_event_producer, new_event_consumer) = new_event_buffer.split();

	let new_event_storage = Box::new(MemoryEventStorage::new());
	let _new_event_writer = EventWriter::start(
		new_event_consumer,
		new_event_storage,
		EventWriterConfig {
			batch_size: 10,
			batch_timeout_ms: 100,
			verbose_logging: true,
		},
	);

	let new_engine = MatchingEngine::start(
		engine_config,
		new_queue_receiver,
		new_event_producer,
		journal,
		Vec::new(),
	);

	let restore_result = new_engine.restore_from_snapshot(snapshot.clone());
	assert!(restore_result.is_ok(), "failed to restore snapshot: {:?}", restore_result.err());

	std::thread::sleep(std::time::Duration::from_millis(100));
	let new_snapshot = new_engine.create_snapshot().unwrap();
	assert_eq!(new_snapshot.metadata.event_seq, snapshot.metadata.event_seq);

	drop(new_engine);
	drop(_new_event_writer);
}

#[test]
fn test_event_replay_reconstructs_orderbook() {
	let journal: Box<dyn OrderJournal> = Box::new(MemoryOrderJournal::new());
	let journal = Arc::new(Mutex::new(journal));

	let ingress_queue = IngressQueue::new(100);
	let (_queue_sender, queue_receiver) = ingress_queue.split();

	let event_buffer = EventBuffer::new(100);
	let (event_producer, event_consumer) = event_buffer.split();

	let event_storage = Box::new(MemoryEventStorage::new());

	let _event_writer = EventWriter::start(
		event_consumer,
		event_storage,
		EventWriterConfig {
			batch_size: 10,
			batch_timeout_ms: 100,
			verbose_logging: true,
		},
	);

	let engine_config = EngineConfig {
		stock_id: "ACME".to_string(),
		verbose_logging: true,
	};

	let matching_engine = MatchingEngine::start(engine_config, queue_receiver, event_producer, journal, Vec::new());

	let events = vec![
		MatchingEvent::OrderAccepted {
			seq: 1,
			stock_tx_id: StockTxId::new(),
			stock_id: "ACME".to_string(),
			side: Side::Buy,
			price: Some(50000),
			qty: 10,
			timestamp: Utc::now(),
		},
		MatchingEvent::OrderAccepted {
			seq: 2,
			stock_tx_id: StockTxId::new(),
			stock_id: "ACME".to_string(),
			side: Side::Sell,
			price: Some(51000),
			qty: 5,
			timestamp: Utc::now(),
		},
	];

	let replay_result = matching_engine.replay_events(events);
	assert!(replay_result.is_ok(), "failed to replay events: {:?}", replay_result.err());

	std::thread::sleep(std::time::Duration::from_millis(100));

	let snapshot = matching_engine.create_snapshot().unwrap();
	assert!(snapshot.metadata.size_bytes > 0);

	drop(matching_engine);
	drop(_event_writer);
}

#[test]
fn test_maker_order_events_emitted() {
	let journal: Box<dyn OrderJournal> = Box::new(MemoryOrderJournal::new());
	let journal = Arc::new(Mutex::new(journal));

	let ingress_queue = IngressQueue::new(100);
	let (queue_sender, queue_receiver) = ingress_queue.split();

	let event_buffer = EventBuffer::new(100);
	let (event_producer, event_consumer) = event_buffer.split();

	let event_storage = Box::new(MemoryEventStorage::new());
	let event_storage_ref = unsafe {
		// Tests only: events are written on the writer's thread, but we
		// want to inspect the same in-memory storage from here afterward.
		let ptr = &*event_storage as *const MemoryEventStorage;
		&*ptr
	};

	let _event_writer = EventWriter::start(
		event_consumer,
		event_storage,
		EventWriterConfig {
			batch_size: 5,
			batch_timeout_ms: 50,
			verbose_logging: true,
		},
	);

	let engine_config = EngineConfig {
		stock_id: "ACME".to_string(),
		verbose_logging: true,
	};

	let _matching_engine = MatchingEngine::start(engine_config, queue_receiver, event_producer, journal, Vec::new());

	// Maker order first, resting on the book.
	submit(&queue_sender, new_order("ACME", "maker", Side::Sell, 50000, 10));
	std::thread::sleep(std::time::Duration::from_millis(100));

	// Taker order that partially fills it.
	submit(&queue_sender, new_order("ACME", "taker", Side::Buy, 50000, 5));
	std::thread::sleep(std::time::Duration::from_millis(300));

	let events = event_storage_ref.replay_from(1).unwrap();
	let has_maker_partial = events.iter().any(|e| matches!(e, MatchingEvent::MakerOrderPartiallyFilled { .. }));

	assert!(has_maker_partial, "expected a MakerOrderPartiallyFilled event but didn't find one");

	drop(_matching_engine);
	drop(_event_writer);
}
