use puzzlenet_core::audio_station::{AudioStation, AudioStationConfig};
use puzzlenet_core::coordinator::{
    Coordinator, CoordinatorConfig, RouteError, SatelliteEntry, StartGame,
};
use puzzlenet_core::link::{RadioPort, RadioProfile, SimulatedRadio};
use puzzlenet_core::peripherals::MockBoard;
use puzzlenet_core::puzzle::{PuzzleConfig, PuzzleEngine, PuzzleFlags, Stage};
use puzzlenet_core::satellite::{Satellite, SatelliteConfig, SatelliteRole};
use puzzlenet_core::PeerAddress;

const HUB: PeerAddress = PeerAddress::new([0x24, 0x6F, 0x28, 0, 0, 0x01]);
const CASE: PeerAddress = PeerAddress::new([0x24, 0x6F, 0x28, 0, 0, 0x02]);
const BIRD: PeerAddress = PeerAddress::new([0x24, 0x6F, 0x28, 0, 0, 0x03]);

const STEP_MS: u64 = 50;

struct Net {
    radio: SimulatedRadio,
    hub: Coordinator<RadioPort>,
    case: Satellite<RadioPort>,
    case_board: MockBoard,
    bird: Satellite<RadioPort>,
    bird_board: MockBoard,
    now: u64,
}

impl Net {
    fn new(profile: RadioProfile, seed: u64) -> Self {
        let radio = SimulatedRadio::new(profile, seed);
        let hub = Coordinator::new(
            radio.port(HUB),
            CoordinatorConfig {
                satellites: vec![
                    SatelliteEntry {
                        name: "suitcase".into(),
                        address: CASE,
                    },
                    SatelliteEntry {
                        name: "golab".into(),
                        address: BIRD,
                    },
                ],
                session_satellite: Some("golab".into()),
                ..CoordinatorConfig::default()
            },
            0,
        );
        let case_board = MockBoard::new();
        let mut case = Satellite::new(
            radio.port(CASE),
            SatelliteConfig::new(HUB, "suitcase_alive"),
            SatelliteRole::Puzzle(PuzzleEngine::new(
                PuzzleConfig {
                    correct_code: "124".into(),
                    ..PuzzleConfig::default()
                },
                0,
            )),
            case_board.peripherals(),
            0,
        );
        let bird_board = MockBoard::new();
        let mut bird = Satellite::new(
            radio.port(BIRD),
            SatelliteConfig::new(HUB, "golab_alive"),
            SatelliteRole::AudioStation(AudioStation::new(AudioStationConfig::default())),
            bird_board.peripherals(),
            0,
        );
        case.boot(0);
        bird.boot(0);
        Self {
            radio,
            hub,
            case,
            case_board,
            bird,
            bird_board,
            now: 0,
        }
    }

    fn step(&mut self) {
        self.now += STEP_MS;
        let now = self.now;
        for d in self.radio.deliver(HUB) {
            self.hub.handle_datagram(d, now);
        }
        self.hub.tick(now);
        for d in self.radio.deliver(CASE) {
            self.case.handle_datagram(d, now);
        }
        self.case.poll(now);
        for d in self.radio.deliver(BIRD) {
            self.bird.handle_datagram(d, now);
        }
        self.bird.poll(now);
    }

    fn run_for(&mut self, ms: u64) {
        for _ in 0..ms / STEP_MS {
            self.step();
        }
    }

    fn type_keys(&mut self, keys: &str) {
        self.case_board.state().keys.extend(keys.chars());
        self.run_for((keys.len() as u64 + 2) * STEP_MS);
    }

    fn present_tag(&mut self, tag: &str) {
        self.case_board.state().tags.push_back(tag.into());
        self.run_for(2 * STEP_MS);
    }

    fn hub_stage(&self) -> Option<Stage> {
        self.hub
            .puzzle_status("suitcase")
            .and_then(|s| s.snapshot)
            .map(|s| s.stage)
    }

    fn case_stage(&self) -> Stage {
        self.case.puzzle().map(|e| e.stage()).unwrap_or(Stage::WaitingTag1)
    }
}

#[test]
fn suitcase_run_is_mirrored_by_coordinator() {
    let mut net = Net::new(RadioProfile::default(), 1);
    net.run_for(100);
    assert!(net.hub.is_connected("suitcase"));
    assert_eq!(net.hub_stage(), Some(Stage::WaitingTag1));

    net.present_tag("F1AAF73");
    assert_eq!(net.case_stage(), Stage::KeypadActive);
    let status = net.hub.puzzle_status("suitcase").unwrap();
    let snapshot = status.snapshot.unwrap();
    assert_eq!(snapshot.stage, Stage::KeypadActive);
    assert!(snapshot.flags.contains(PuzzleFlags::TAG1_USED));
    assert!(snapshot.relay);

    net.type_keys("999#");
    net.type_keys("123*4#");
    assert_eq!(net.case_stage(), Stage::WaitingTag2);
    let status = net.hub.puzzle_status("suitcase").unwrap();
    assert_eq!(status.history.len(), 2);
    assert!(!status.history[0].correct);
    assert_eq!(status.history[1].code, "124");
    assert!(status.history[1].correct);
    assert_eq!(status.digit_frequency.count(9), 3);
    assert_eq!(status.digit_frequency.count(3), 0);

    net.present_tag("E3BF25E2");
    net.type_keys("1");
    assert_eq!(net.case_stage(), Stage::Completed);
    assert_eq!(net.hub_stage(), Some(Stage::Completed));
    assert_eq!(net.case_board.state().played.last(), Some(&5));
}

#[test]
fn session_and_hint_flow_through_the_station() {
    let mut net = Net::new(RadioProfile::default(), 2);
    // The station only speaks on its heartbeat.
    net.run_for(15_100);
    assert!(net.hub.is_connected("golab"));

    net.hub
        .start_game(
            StartGame {
                group_label: Some("Team A".into()),
                ..StartGame::default()
            },
            net.now,
        )
        .unwrap();
    net.step();
    let station = net.bird.station().unwrap();
    assert!(station.game_active());
    assert_eq!(station.group(), "Team A");

    net.hub.play_audio("golab", net.now).unwrap();
    net.step();
    assert_eq!(net.bird_board.state().played, vec![1]);

    net.bird_board.state().button = true;
    net.run_for(3_200);
    net.bird_board.state().button = false;
    net.step();
    let hint = net.hub.poll_hint(net.now);
    assert!(hint.hint_requested);
    assert!(!net.hub.poll_hint(net.now).hint_requested);

    net.hub.end_game("completed", net.now).unwrap();
    net.step();
    assert!(!net.bird.station().unwrap().game_active());
    assert!(!net.hub.session().is_active);
}

#[test]
fn reset_from_coordinator_is_idempotent() {
    let mut net = Net::new(RadioProfile::default(), 3);
    net.run_for(100);
    net.present_tag("F1AAF73");
    net.type_keys("55#");
    net.type_keys("12");
    let history = net.case.puzzle().unwrap().history().len();

    net.hub.reset_puzzle("suitcase", net.now).unwrap();
    net.step();
    let once = net.case.puzzle().unwrap().snapshot(net.now);
    net.hub.reset_puzzle("suitcase", net.now).unwrap();
    net.step();
    let twice = net.case.puzzle().unwrap().snapshot(net.now);

    assert_eq!((once.stage, once.flags, once.entered), (twice.stage, twice.flags, twice.entered));
    assert_eq!(twice.stage, Stage::WaitingTag1);
    assert!(twice.flags.is_empty());
    assert_eq!(twice.entered, 0);
    assert_eq!(net.case.puzzle().unwrap().history().len(), history);
    assert_eq!(net.hub_stage(), Some(Stage::WaitingTag1));
    assert!(!net.case_board.state().relay);
}

#[test]
fn partition_makes_satellite_unroutable_but_not_stuck() {
    let mut net = Net::new(RadioProfile::default(), 4);
    net.run_for(100);
    assert!(net.hub.is_connected("suitcase"));

    net.radio.set_down(CASE, true);
    net.run_for(31_000);
    assert!(!net.hub.is_connected("suitcase"));
    assert!(matches!(
        net.hub.open_lock("suitcase", net.now),
        Err(RouteError::NotConnected(_))
    ));
    assert!(!net.case.coordinator_connected());

    // The puzzle keeps working on its own.
    net.present_tag("F1AAF73");
    assert_eq!(net.case_stage(), Stage::KeypadActive);

    net.radio.set_down(CASE, false);
    net.run_for(16_000);
    assert!(net.hub.is_connected("suitcase"));
    net.hub.request_status("suitcase", net.now).unwrap();
    net.run_for(2 * STEP_MS);
    assert_eq!(net.hub_stage(), Some(Stage::KeypadActive));
}

#[test]
fn lossy_link_converges_without_duplicate_history() {
    let mut net = Net::new(
        RadioProfile {
            loss_percent: 20.0,
            duplicate_percent: 30.0,
            send_failure_percent: 0.0,
            reorder: true,
        },
        0x5eed,
    );
    net.run_for(100);
    net.present_tag("F1AAF73");
    for _ in 0..3 {
        net.type_keys("31#");
    }
    net.type_keys("124#");
    net.present_tag("E3BF25E2");
    net.type_keys("2");
    assert_eq!(net.case_stage(), Stage::Completed);

    // Ask for the state until a reply makes it through.
    for _ in 0..60 {
        if net.hub_stage() == Some(Stage::Completed) {
            break;
        }
        let _ = net.hub.request_status("suitcase", net.now);
        net.run_for(2_000);
    }
    assert_eq!(net.hub_stage(), Some(Stage::Completed));

    let mirrored = net.hub.puzzle_status("suitcase").unwrap().history;
    let local: Vec<_> = net.case.puzzle().unwrap().history().iter().cloned().collect();
    assert!(mirrored.len() <= local.len());
    for (i, e) in mirrored.iter().enumerate() {
        assert!(local.contains(e), "{:?} was never entered", e);
        assert!(
            !mirrored[i + 1..]
                .iter()
                .any(|o| o.code == e.code && o.entered_at == e.entered_at),
            "duplicate {:?}",
            e
        );
    }
    let (sent, lost) = net.radio.stats();
    assert!(sent > 0 && lost > 0);
}
