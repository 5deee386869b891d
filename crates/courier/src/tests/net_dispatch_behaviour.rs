//! Behavioural tests for the distributed router.

use std::cell::RefCell;
use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use courier_config::ChannelEndpoint;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::Scoreboard;
use crate::{
    DispatchSettings, ListenerHandle, ListenerState, Mapping, NetCommand, NetDispatcher,
    NormalizedValue, SocketSubscription,
};

struct NetWorld {
    dispatcher: NetDispatcher,
    scoreboards: Vec<Arc<Scoreboard>>,
    faulty: Option<Arc<Scoreboard>>,
    handled: Option<bool>,
    listener: Option<ListenerHandle>,
    address: Option<SocketAddr>,
}

impl NetWorld {
    fn new() -> Self {
        let settings = DispatchSettings::default().with_poll_interval(Duration::from_millis(10));
        Self {
            dispatcher: NetDispatcher::new(settings),
            scoreboards: Vec::new(),
            faulty: None,
            handled: None,
            listener: None,
            address: None,
        }
    }

    fn subscribe(&mut self, command: &str, required: &[String], faulty: bool) -> Arc<Scoreboard> {
        let scoreboard = Arc::new(Scoreboard::new(command, required, faulty));
        self.dispatcher
            .register_net_commands(&scoreboard)
            .expect("register scoreboard");
        scoreboard
    }

    fn handle(&mut self, payload: &[u8]) {
        self.handled = Some(self.dispatcher.handle_message(payload));
    }

    fn start_listener(&mut self) {
        let endpoint = ChannelEndpoint::tcp("127.0.0.1", 0);
        let subscription =
            SocketSubscription::bind(&endpoint, self.dispatcher.settings().max_payload_bytes())
                .expect("bind channel");
        self.address = subscription.local_addr();
        self.listener = Some(self.dispatcher.start(subscription).expect("start worker"));
    }
}

impl Drop for NetWorld {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.shutdown();
            let _ = handle.join();
        }
    }
}

#[fixture]
fn world() -> RefCell<NetWorld> {
    RefCell::new(NetWorld::new())
}

fn strip_quotes(value: &str) -> &str {
    value.trim_matches('"')
}

fn score(player: &str, amount: i64) -> Mapping {
    let mut mapping = Mapping::new();
    mapping.insert("player".to_owned(), NormalizedValue::from(player));
    mapping.insert("amount".to_owned(), NormalizedValue::from(amount));
    mapping
}

fn score_payload(player: &str, amount: i64) -> NetCommand {
    NetCommand::new("addscore")
        .with_field("player", player)
        .with_field("amount", amount)
}

fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

fn subscribe_scoreboards(world: &RefCell<NetWorld>, count: usize, command: &str, fields: &str) {
    let required: Vec<String> = strip_quotes(fields)
        .split(',')
        .map(|field| field.trim().to_owned())
        .filter(|field| !field.is_empty())
        .collect();
    let mut world = world.borrow_mut();
    for _ in 0..count {
        let scoreboard = world.subscribe(strip_quotes(command), &required, false);
        world.scoreboards.push(scoreboard);
    }
}

#[given("{count} scoreboards subscribed to \"{command}\" requiring \"{fields}\"")]
fn given_scoreboards(world: &RefCell<NetWorld>, count: usize, command: String, fields: String) {
    subscribe_scoreboards(world, count, &command, &fields);
}

#[given("a faulty scoreboard subscribed to \"{command}\"")]
fn given_faulty_scoreboard(world: &RefCell<NetWorld>, command: String) {
    let mut world = world.borrow_mut();
    let faulty = world.subscribe(strip_quotes(&command), &[], true);
    world.faulty = Some(faulty);
}

#[given("another scoreboard subscribed to \"{command}\" requiring \"{fields}\"")]
fn given_trailing_scoreboard(world: &RefCell<NetWorld>, command: String, fields: String) {
    subscribe_scoreboards(world, 1, &command, &fields);
}

#[given("the dispatcher listens on a TCP channel")]
fn given_listener(world: &RefCell<NetWorld>) {
    world.borrow_mut().start_listener();
}

#[when("a score for \"{player}\" of {amount} is handled")]
fn when_score_handled(world: &RefCell<NetWorld>, player: String, amount: i64) {
    let payload = score_payload(strip_quotes(&player), amount)
        .to_bytes()
        .expect("serialise score");
    world.borrow_mut().handle(&payload);
}

#[when("a score for \"{player}\" without an amount is handled")]
fn when_partial_score_handled(world: &RefCell<NetWorld>, player: String) {
    let payload = NetCommand::new("addscore")
        .with_field("player", strip_quotes(&player))
        .to_bytes()
        .expect("serialise score");
    world.borrow_mut().handle(&payload);
}

#[when("the raw payload \"{payload}\" is handled")]
fn when_raw_payload_handled(world: &RefCell<NetWorld>, payload: String) {
    world
        .borrow_mut()
        .handle(strip_quotes(&payload).as_bytes());
}

#[when("a publisher sends a score for \"{player}\" of {amount} over the channel")]
fn when_published_over_channel(world: &RefCell<NetWorld>, player: String, amount: i64) {
    let address = world.borrow().address.expect("listener address");
    let line = score_payload(strip_quotes(&player), amount)
        .to_line()
        .expect("serialise score");
    let mut stream = TcpStream::connect(address).expect("connect publisher");
    stream.write_all(b"garbage\n").expect("write garbage");
    stream.write_all(line.as_bytes()).expect("write score");
    stream.flush().expect("flush");
}

#[when("the dispatcher is shut down")]
fn when_shut_down(world: &RefCell<NetWorld>) {
    let handle = world.borrow_mut().listener.take().expect("listener running");
    handle.shutdown();
    assert!(eventually(|| handle.state() == ListenerState::Stopped));
    handle.join().expect("join worker");
}

#[then("the message is handled")]
fn then_handled(world: &RefCell<NetWorld>) {
    assert_eq!(world.borrow().handled, Some(true));
}

#[then("the message is not handled")]
fn then_not_handled(world: &RefCell<NetWorld>) {
    assert_eq!(world.borrow().handled, Some(false));
}

#[then("every scoreboard received \"{player}\" with {amount}")]
fn then_every_scoreboard_received(world: &RefCell<NetWorld>, player: String, amount: i64) {
    let expected = vec![score(strip_quotes(&player), amount)];
    for scoreboard in &world.borrow().scoreboards {
        assert_eq!(scoreboard.received(), expected);
    }
}

#[then("every scoreboard eventually receives \"{player}\" with {amount}")]
fn then_every_scoreboard_eventually_receives(
    world: &RefCell<NetWorld>,
    player: String,
    amount: i64,
) {
    let expected = vec![score(strip_quotes(&player), amount)];
    let world = world.borrow();
    assert!(
        eventually(|| world
            .scoreboards
            .iter()
            .all(|scoreboard| scoreboard.received() == expected)),
        "scoreboards never received the published score"
    );
}

#[then("the faulty scoreboard was attempted")]
fn then_faulty_attempted(world: &RefCell<NetWorld>) {
    let world = world.borrow();
    let faulty = world.faulty.as_ref().expect("faulty scoreboard registered");
    assert_eq!(faulty.received().len(), 1);
}

#[then("no scoreboard received anything")]
fn then_nothing_received(world: &RefCell<NetWorld>) {
    for scoreboard in &world.borrow().scoreboards {
        assert!(scoreboard.received().is_empty());
    }
}

#[scenario(path = "tests/features/net_dispatch.feature")]
fn net_dispatch(#[from(world)] world: RefCell<NetWorld>) {
    drop(world);
}
