use super::*;
use dsagent_protocols::DriverCommand;

#[test]
fn test_starts_uninitialized() {
    let fsm = StateMachine::dataset_agent();
    assert_eq!(fsm.current_state(), AgentState::Uninitialized);
}

#[test]
fn test_initialize_only_from_uninitialized() {
    let mut fsm = StateMachine::dataset_agent();
    assert_eq!(fsm.handler_for(&AgentEvent::Initialize).unwrap(), Handler::Initialize);

    fsm.set_state(AgentState::Idle);
    let err = fsm.handler_for(&AgentEvent::Initialize).unwrap_err();
    assert!(matches!(
        err,
        AgentError::UnhandledEvent {
            state: AgentState::Idle,
            event: EventKind::Initialize
        }
    ));
}

#[test]
fn test_simple_transitions() {
    let fsm = StateMachine::dataset_agent();
    let cases = [
        (AgentState::Idle, EventKind::Run, AgentState::Command),
        (AgentState::Idle, EventKind::GoInactive, AgentState::Inactive),
        (AgentState::Command, EventKind::Pause, AgentState::Paused),
        (AgentState::Command, EventKind::Clear, AgentState::Idle),
        (AgentState::Streaming, EventKind::GoCommand, AgentState::Command),
        (AgentState::Paused, EventKind::Resume, AgentState::Command),
        (AgentState::Paused, EventKind::Clear, AgentState::Idle),
        (AgentState::ActiveUnknown, EventKind::GoInactive, AgentState::Inactive),
        (AgentState::ActiveUnknown, EventKind::GoCommand, AgentState::Command),
    ];
    for (state, event, next) in cases {
        assert_eq!(
            fsm.lookup(state, event),
            Some(Handler::GoTo(next)),
            "{} + {}",
            state,
            event
        );
    }
}

#[test]
fn test_execute_resource_states() {
    let mut fsm = StateMachine::dataset_agent();
    let event = AgentEvent::ExecuteResource(DriverCommand::StartAutosample);

    for state in [AgentState::Command, AgentState::Streaming] {
        fsm.set_state(state);
        assert_eq!(fsm.handler_for(&event).unwrap(), Handler::ExecuteResource);
    }

    fsm.set_state(AgentState::Idle);
    assert!(fsm.handler_for(&event).is_err());
}

#[test]
fn test_lost_connection_entry_points() {
    let fsm = StateMachine::dataset_agent();
    for state in [
        AgentState::Inactive,
        AgentState::Idle,
        AgentState::Command,
        AgentState::Streaming,
        AgentState::Paused,
        AgentState::ActiveUnknown,
    ] {
        assert_eq!(
            fsm.lookup(state, EventKind::LostConnection),
            Some(Handler::LostConnection)
        );
    }

    // one entry per episode
    assert_eq!(fsm.lookup(AgentState::LostConnection, EventKind::LostConnection), None);
    assert_eq!(fsm.lookup(AgentState::Uninitialized, EventKind::LostConnection), None);
}

#[test]
fn test_autoreconnect_only_in_lost_connection() {
    let fsm = StateMachine::dataset_agent();
    for state in AgentState::ALL {
        let expected = (state == AgentState::LostConnection).then_some(Handler::Autoreconnect);
        assert_eq!(fsm.lookup(state, EventKind::Autoreconnect), expected, "{}", state);
    }
}

#[test]
fn test_reset_everywhere_but_uninitialized() {
    let fsm = StateMachine::dataset_agent();
    for state in AgentState::ALL {
        let handled = fsm.lookup(state, EventKind::Reset).is_some();
        assert_eq!(handled, state != AgentState::Uninitialized, "{}", state);
    }
}

#[test]
fn test_capabilities_handled_everywhere() {
    let fsm = StateMachine::dataset_agent();
    for state in AgentState::ALL {
        assert_eq!(
            fsm.lookup(state, EventKind::GetResourceCapabilities),
            Some(Handler::GetResourceCapabilities)
        );
    }
}

#[test]
fn test_handled_events_and_capability_filter() {
    let fsm = StateMachine::dataset_agent();
    let events = fsm.handled_events(AgentState::LostConnection);
    assert_eq!(events.len(), 3);
    assert!(events.contains(&EventKind::Autoreconnect));

    let caps: Vec<_> = events.into_iter().filter(|e| dataset_capability(*e)).collect();
    assert_eq!(caps, vec![EventKind::Reset]);
}

#[test]
fn test_add_handler_overrides() {
    let mut fsm = StateMachine::new(AgentState::Idle);
    assert!(fsm.handler_for(&AgentEvent::Run).is_err());

    fsm.add_handler(AgentState::Idle, EventKind::Run, Handler::GoTo(AgentState::Streaming));
    assert_eq!(
        fsm.handler_for(&AgentEvent::Run).unwrap(),
        Handler::GoTo(AgentState::Streaming)
    );
}
