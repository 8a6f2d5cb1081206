//! End-to-end sessions over a temporary campaign seeded with the reference
//! content and a dice roller that always returns 10.

use std::sync::Arc;

use game_content::{CampaignLayout, ContentFactory};
use game_core::state::{LAST_ADJUDICATION, PENDING_ASK};
use game_core::{CommandError, Evaluator, Event, ExecutorOptions, FixedRoller};
use runtime::{EventRepository, FileEventLog, Session, SessionError};
use tempfile::TempDir;

struct Campaign {
    _dir: TempDir,
    factory: ContentFactory,
}

impl Campaign {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let layout = CampaignLayout::new(dir.path(), "testworld", "testcampaign");
        let factory = ContentFactory::new(layout);
        assert!(factory.install_reference().unwrap());
        Self { _dir: dir, factory }
    }

    fn open(&self) -> Session {
        self.open_with(ExecutorOptions::default())
    }

    fn open_with(&self, options: ExecutorOptions) -> Session {
        Session::builder()
            .manifest(self.factory.load_manifest().unwrap())
            .loader(Arc::new(self.factory.load_data().unwrap()))
            .event_log(FileEventLog::open(self.factory.layout().log_path()).unwrap())
            .evaluator(Evaluator::new(FixedRoller(10)))
            .options(options)
            .build()
            .unwrap()
    }

    fn logged(&self) -> Vec<Event> {
        FileEventLog::open(self.factory.layout().log_path())
            .unwrap()
            .load()
            .unwrap()
    }
}

fn set_spent_actions(session: &mut Session, value: i64) {
    session
        .submit(&format!("set of: fighter section: spent key: actions value: {value}"))
        .unwrap();
    assert_eq!(session.state().entity("fighter").unwrap().spent["actions"], value);
}

// ============================================================================
// S1-S8
// ============================================================================

#[test]
fn test_s1_gm_restriction() {
    let campaign = Campaign::new();
    let mut session = campaign.open();

    let err = session.submit("encounter start by: fighter").unwrap_err();
    assert!(matches!(
        err,
        SessionError::Command(CommandError::Unauthorized { .. })
    ));
    assert!(campaign.logged().is_empty());
    assert_eq!(session.event_count(), 0);
}

#[test]
fn test_s2_loop_lifecycle() {
    let campaign = Campaign::new();
    let mut session = campaign.open();

    let events = session.submit("encounter start").unwrap();
    assert_eq!(
        events,
        vec![
            Event::Loop {
                loop_name: "encounter_start".into(),
                active: true
            },
            Event::LoopOrderAscending {
                loop_name: "encounter_start".into(),
                ascending: false
            },
        ]
    );
    assert!(session.state().is_loop_active("encounter_start"));

    let first = session.execute("encounter end").unwrap();
    assert_eq!(
        first,
        Some(Event::Loop {
            loop_name: "encounter_start".into(),
            active: false
        })
    );
    assert!(!session.state().is_loop_active("encounter_start"));
    assert_eq!(campaign.logged().len(), 3);
}

#[test]
fn test_s3_initiative_ordering() {
    let campaign = Campaign::new();
    let mut session = campaign.open();
    session.submit("encounter start").unwrap();

    let events = session.submit("initiative by: fighter").unwrap();
    assert_eq!(
        events,
        vec![Event::LoopOrder {
            loop_name: "encounter_start".into(),
            actor: "fighter".into(),
            value: 12
        }]
    );
    let encounter = session.state().get_loop("encounter_start").unwrap();
    assert_eq!(encounter.order["fighter"], 12);
    assert_eq!(encounter.current_actor(), Some("fighter"));
}

#[test]
fn test_s4_target_iteration() {
    let campaign = Campaign::new();
    let mut session = campaign.open();

    let events = session
        .submit("encounter start with: fighter and goblin")
        .unwrap();
    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], Event::Loop { active: true, .. }));
    assert!(matches!(events[1], Event::LoopOrderAscending { ascending: false, .. }));
    assert_eq!(
        events[2..],
        [
            Event::AskIssued {
                target: "fighter".into(),
                options: vec!["initiative".into()]
            },
            Event::AskIssued {
                target: "goblin".into(),
                options: vec!["initiative".into()]
            },
        ]
    );
    // Only the latest ask stays pending.
    assert_eq!(
        session.state().metadata_value(PENDING_ASK).unwrap()["target"],
        "goblin"
    );
}

#[test]
fn test_s5_prereq_blocks_execution() {
    let campaign = Campaign::new();
    let mut session = campaign.open();
    set_spent_actions(&mut session, 1);
    let logged = campaign.logged().len();

    let err = session.submit("grapple by: fighter to: goblin").unwrap_err();
    let SessionError::Command(CommandError::Prereq { message }) = err else {
        panic!("expected a prereq failure, got {err:?}");
    };
    assert_eq!(message, "You have no actions left this turn.");
    assert_eq!(campaign.logged().len(), logged);
    assert!(!session.state().entity("goblin").unwrap().has_condition("grappled"));
}

#[test]
fn test_s6_grapple_happy_path() {
    let campaign = Campaign::new();
    let mut session = campaign.open();
    set_spent_actions(&mut session, 1);
    set_spent_actions(&mut session, 0);

    let events = session.submit("grapple by: fighter to: goblin").unwrap();
    assert_eq!(
        events,
        vec![
            Event::Check {
                actor: "fighter".into(),
                check: "contest".into(),
                passed: true
            },
            Event::Condition {
                actor: "goblin".into(),
                condition: "grappled".into(),
                add: true
            },
            Event::AddSpent {
                actor: "fighter".into(),
                key: "actions".into()
            },
        ]
    );
    let state = session.state();
    assert_eq!(state.entity("fighter").unwrap().spent["actions"], 1);
    assert!(state.entity("goblin").unwrap().has_condition("grappled"));

    // Out of actions now.
    assert!(session.submit("grapple by: fighter to: goblin").is_err());
}

#[test]
fn test_s7_hardcoded_roll() {
    let campaign = Campaign::new();
    let mut session = campaign.open();
    let before = session.state().clone();

    let events = session.submit("roll by: fighter dice: 1d20").unwrap();
    assert_eq!(
        events,
        vec![Event::DiceRolled {
            actor: "fighter".into(),
            dice: "1d20".into(),
            result: 10
        }]
    );
    assert_eq!(session.state(), &before);
    assert_eq!(campaign.logged(), events);
}

#[test]
fn test_s8_replay_round_trip() {
    let campaign = Campaign::new();
    let mut session = campaign.open();
    session.submit("encounter start").unwrap();
    session.submit("encounter end").unwrap();
    session.submit("grapple by: fighter to: goblin").unwrap();

    let expected = session.state().clone();
    assert!(session.verify().unwrap());
    session.close().unwrap();

    let reopened = campaign.open();
    assert_eq!(reopened.state(), &expected);
    assert_eq!(reopened.state().digest(), expected.digest());
    assert_eq!(reopened.event_count(), 6);
}

// ============================================================================
// Session behaviour beyond the core scenarios
// ============================================================================

#[test]
fn test_adjudicated_command_reruns_after_allow() {
    let campaign = Campaign::new();
    let mut session = campaign.open();

    let raw = "improvise by: fighter what: swings from the chandelier";
    let events = session.submit(raw).unwrap();
    assert_eq!(
        events,
        vec![Event::AskIssued {
            target: "GM".into(),
            options: vec![raw.into()]
        }]
    );

    // Players cannot approve their own ideas.
    assert!(session.submit("allow by: fighter").is_err());

    let events = session.submit("allow").unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0],
        Event::MetadataChanged {
            key: PENDING_ASK.into(),
            value: serde_json::Value::Null
        }
    );
    assert!(matches!(&events[1], Event::MetadataChanged { key, .. } if key == LAST_ADJUDICATION));
    assert_eq!(
        events[2],
        Event::Hint {
            message: "Fighter swings from the chandelier".into()
        }
    );
    assert!(session.state().metadata_value(PENDING_ASK).is_none());
}

#[test]
fn test_denied_command_does_not_run() {
    let campaign = Campaign::new();
    let mut session = campaign.open();

    session.submit("improvise by: fighter what: juggles").unwrap();
    let events = session.submit("deny").unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| matches!(e, Event::MetadataChanged { .. })));
    assert_eq!(
        session.state().metadata_value(LAST_ADJUDICATION),
        Some(&serde_json::json!({ "approved": false }))
    );
}

#[test]
fn test_freeze_silences_players() {
    let campaign = Campaign::new();
    let mut session = campaign.open();
    session.submit("freeze").unwrap();
    assert!(session.state().is_frozen());

    assert_eq!(session.submit("roll by: fighter dice: 1d20").unwrap(), vec![]);
    assert_eq!(session.execute("hint by: fighter").unwrap(), None);
    assert_eq!(session.submit("roll dice: 1d6").unwrap().len(), 1);

    session.submit("unfreeze").unwrap();
    assert!(!session.state().is_frozen());
    assert_eq!(session.submit("roll by: fighter dice: 1d20").unwrap().len(), 1);
}

#[test]
fn test_turn_bound_commands_ignore_other_actors() {
    let campaign = Campaign::new();
    let mut session = campaign.open();
    session.submit("encounter start with: fighter and goblin").unwrap();
    session.submit("initiative by: fighter").unwrap();
    session.submit("initiative by: goblin").unwrap();

    let encounter = session.state().get_loop("encounter_start").unwrap();
    assert_eq!(encounter.current_actor(), Some("fighter"));

    let logged = campaign.logged().len();
    assert_eq!(session.submit("grapple by: goblin to: fighter").unwrap(), vec![]);
    assert_eq!(session.submit("end turn by: goblin").unwrap(), vec![]);
    assert_eq!(campaign.logged().len(), logged);

    let events = session.submit("end turn by: fighter").unwrap();
    assert_eq!(
        events,
        vec![Event::LoopAdvanced {
            loop_name: "encounter_start".into()
        }]
    );
    let encounter = session.state().get_loop("encounter_start").unwrap();
    assert_eq!(encounter.current_actor(), Some("goblin"));
}

#[test]
fn test_spawn_adds_entity_once() {
    let campaign = Campaign::new();
    let mut session = campaign.open();

    let event = session.execute("spawn id: wolf name: Dire Wolf").unwrap();
    assert!(matches!(event, Some(Event::EntityAdded { ref entity }) if entity.name == "Dire Wolf"));
    assert!(session.state().contains_entity("wolf"));

    let err = session.submit("spawn id: wolf").unwrap_err();
    assert!(matches!(err, SessionError::Command(CommandError::Prereq { .. })));
}

#[test]
fn test_parse_and_param_errors_carry_usage() {
    let campaign = Campaign::new();
    let mut session = campaign.open();

    let err = session.submit("with: goblin").unwrap_err();
    assert!(matches!(err, SessionError::Parse { .. }));
    assert!(err.usage().is_some());

    let err = session.submit("check by: fighter stat: str").unwrap_err();
    assert_eq!(err.usage(), Some("check by: <actor> stat: <stat> dc: <number>"));

    let err = session.submit("dance by: fighter").unwrap_err();
    assert!(matches!(
        err,
        SessionError::Command(CommandError::UnknownCommand { .. })
    ));
}

#[test]
fn test_transcribed_rolls_precede_mapped_event() {
    let campaign = Campaign::new();
    let mut session = campaign.open_with(ExecutorOptions {
        transcribe_rolls: true,
    });
    session.submit("encounter start").unwrap();

    let events = session.submit("initiative by: fighter").unwrap();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], Event::DiceRolled { dice, result: 10, .. } if dice == "1d20"));
    assert!(matches!(events[1], Event::LoopOrder { value: 12, .. }));
}

#[test]
fn test_corrupted_log_aborts_startup() {
    let campaign = Campaign::new();
    {
        let mut session = campaign.open();
        session.submit("encounter start").unwrap();
        session.close().unwrap();
    }
    let path = campaign.factory.layout().log_path();
    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push_str("{\"type\":\"LoopEvent\",\"da");
    std::fs::write(&path, content).unwrap();

    let result = Session::builder()
        .manifest(campaign.factory.load_manifest().unwrap())
        .loader(Arc::new(campaign.factory.load_data().unwrap()))
        .event_log(FileEventLog::open(&path).unwrap())
        .build();
    assert!(matches!(result, Err(SessionError::Storage(_))));
}
