//! End-to-end behavior of pairing, cloning, routing and raycast filtering

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use glam::{Vec2, Vec3};
use stream_multiplayer::config::{
    ActionConfig, ActionMapConfig, ActionTemplateConfig, PlayerConfig, SessionConfig,
};
use stream_multiplayer::host::{Host, NullHost};
use stream_multiplayer::input::{
    ActionBindingSet, ActionMap, Action, ActionReference, DeviceKind, InputUsers, KeyCode,
    KeyboardState, MouseButtons, MouseState, OwnershipLookup, RawEvent, Rect, UserId,
    UserIndexAllocator, ViewportLayout, clone_for_user,
};
use stream_multiplayer::raycast::{
    BlockingObjects, Canvas, Collider3D, Graphic, GraphicRaycaster, GraphicRaycasterSettings,
    LayerMask, PerUserPhysicsRaycaster, PhysicsRaycaster, PhysicsRaycasterSettings, PhysicsScene3D,
    PlayerHierarchy, PointerEvent, Raycaster, SceneRaycaster, ScreenCamera, Shape3D,
};
use stream_multiplayer::InputError;
use stream_multiplayer::session::{Session, SessionEvent, SessionMode};

fn local_devices() -> InputUsers {
    let mut users = InputUsers::new();
    users.adopt_device(DeviceKind::Pointer, "Mouse");
    users.adopt_device(DeviceKind::Keyboard, "Keyboard");
    users
}

fn gameplay_template() -> ActionTemplateConfig {
    ActionTemplateConfig {
        name: "Gameplay".to_string(),
        maps: vec![ActionMapConfig {
            name: "Player".to_string(),
            actions: vec![ActionConfig {
                name: "Fire".to_string(),
                id: None,
                bindings: vec!["<Mouse>/leftButton".to_string()],
            }],
        }],
    }
}

fn two_player_config() -> SessionConfig {
    let mut config = SessionConfig::builtin("test");
    config.players = vec![
        PlayerConfig::new("Player 1", 0).with_actions("Gameplay"),
        PlayerConfig::new("Player 2", 1).with_actions("Gameplay"),
    ];
    config.action_templates = vec![gameplay_template()];
    config
}

fn side_by_side() -> ViewportLayout {
    let mut layout = ViewportLayout::new();
    layout.register_viewport(0, Rect::new(0.0, 0.0, 800.0, 600.0), "Player 1");
    layout.register_viewport(1, Rect::new(800.0, 0.0, 800.0, 600.0), "Player 2");
    layout
}

fn sphere_scene() -> Arc<PhysicsScene3D> {
    Arc::new(PhysicsScene3D::new().with_collider(Collider3D {
        object: 7,
        layer: 0,
        shape: Shape3D::Sphere {
            center: Vec3::new(10.0, 10.0, 20.0),
            radius: 5.0,
        },
    }))
}

#[test]
fn test_pairing_is_exclusive() {
    let mut users = InputUsers::new();
    let mut allocator = UserIndexAllocator::new();
    let first = users.create_user(&mut allocator);
    let second = users.create_user(&mut allocator);
    let device = users.create_synthetic_device(DeviceKind::Pointer, "shared");

    users.pair_device(device, first).unwrap();
    users.pair_device(device, second).unwrap();

    assert_eq!(users.owner_of(device), Some(second));
    assert!(!users.paired_devices(first).unwrap().contains(&device));
}

#[test]
fn test_release_twice_is_a_no_op() {
    let mut users = InputUsers::new();
    let mut allocator = UserIndexAllocator::new();
    let user = users.create_user(&mut allocator);
    let device = users.create_synthetic_device(DeviceKind::Keyboard, "kb");
    users.pair_device(device, user).unwrap();

    assert!(users.release_device(device));
    let devices_after_first = users.devices().len();
    assert!(!users.release_device(device));
    assert_eq!(users.devices().len(), devices_after_first);
    assert_eq!(users.owner_of(device), None);
}

#[test]
fn test_clones_are_independent() {
    let template = ActionBindingSet::new("Gameplay")
        .with_map(ActionMap::new("Player").with_action(Action::new("Fire").bind("<Mouse>/leftButton")));
    let mut first = clone_for_user(&template, UserId(0));
    let second = clone_for_user(&template, UserId(1));

    first.find_by_name_mut("Fire").unwrap().enable();

    assert!(first.find_by_name("fire").unwrap().is_enabled());
    assert!(!second.find_by_name("Fire").unwrap().is_enabled());
    assert!(!template.find_by_name("Fire").unwrap().is_enabled());
    assert_eq!(first.name(), "Gameplay for Player 0");
}

#[test]
fn test_focus_change_releases_before_forwarding() {
    let mut allocator = UserIndexAllocator::new();
    let mut session = Session::start(two_player_config(), local_devices(), &mut allocator, Box::new(NullHost));
    let mouse = session.local_devices().mouse.unwrap();
    let targets = session.router().unwrap().targets().clone();
    let (mouse_0, mouse_1) = (targets[&0].mouse, targets[&1].mouse);
    let mut layout = side_by_side();

    layout.set_pointer(Some([100.0, 100.0]));
    session.tick(&layout);
    let press = RawEvent::mouse(mouse, 0.0, MouseState::at([100.0, 100.0]).with_buttons(MouseButtons::LEFT));
    let delivered = session.handle_event(&press);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].device, mouse_0);

    layout.set_pointer(Some([900.0, 100.0]));
    assert_eq!(session.tick(&layout), vec![SessionEvent::FocusChanged(1)]);
    let drag = RawEvent::mouse(
        mouse,
        0.1,
        MouseState::at([900.0, 100.0])
            .with_buttons(MouseButtons::LEFT)
            .with_delta([800.0, 0.0]),
    );
    let delivered = session.handle_event(&drag);

    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].device, mouse_0, "release goes out first");
    assert!(delivered[0].as_mouse().unwrap().buttons.is_empty());
    assert_eq!(delivered[1].device, mouse_1);

    let devices = session.input().devices();
    let state_0 = devices.get(mouse_0).unwrap().mouse_state().unwrap();
    let state_1 = devices.get(mouse_1).unwrap().mouse_state().unwrap();
    assert!(
        !(state_0.buttons.contains(MouseButtons::LEFT) && state_1.buttons.contains(MouseButtons::LEFT)),
        "both players report the button held"
    );
}

#[test]
fn test_ownership_filtering() {
    let mut users = InputUsers::new();
    let mut allocator = UserIndexAllocator::new();
    let first = users.create_user(&mut allocator);
    let second = users.create_user(&mut allocator);
    let device = users.create_synthetic_device(DeviceKind::Pointer, "p2 mouse");
    users.pair_device(device, second).unwrap();

    let stock = PhysicsRaycaster::new(ScreenCamera::new(0), sphere_scene(), PhysicsRaycasterSettings::default());
    let raycaster = PerUserPhysicsRaycaster::replacing(&stock, Some(first));
    let mut results = Vec::new();
    raycaster.raycast(&users, &PointerEvent::from_device(device, Vec2::new(10.0, 10.0), 0), &mut results);
    assert!(results.is_empty());
}

#[test]
fn test_programmatic_events_are_not_filtered() {
    let users = InputUsers::new();
    let stock = PhysicsRaycaster::new(ScreenCamera::new(0), sphere_scene(), PhysicsRaycasterSettings::default());
    let raycaster = PerUserPhysicsRaycaster::replacing(&stock, Some(UserId(0)));
    let event = PointerEvent::programmatic(Vec2::new(10.0, 10.0), 0);

    let mut filtered = Vec::new();
    raycaster.raycast(&users, &event, &mut filtered);
    let mut unfiltered = Vec::new();
    stock.raycast(&users, &event, &mut unfiltered);

    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered, unfiltered);
}

#[test]
fn test_single_user_without_template() {
    let mut allocator = UserIndexAllocator::new();
    let session = Session::start(SessionConfig::builtin("test"), local_devices(), &mut allocator, Box::new(NullHost));

    assert_eq!(session.mode(), SessionMode::SinglePlayer);
    assert!(session.router().is_none());
    let user = session.players()[0].user;
    assert_eq!(user.index(), 0);
    assert!(session.actions(user).unwrap().is_none());

    let local = session.local_devices();
    assert_eq!(session.owner_of(local.mouse.unwrap()), Some(user));
    assert_eq!(session.owner_of(local.keyboard.unwrap()), Some(user));
    assert!(session.session_devices().is_empty());
}

#[test]
fn test_two_users_share_one_mouse() {
    let mut allocator = UserIndexAllocator::new();
    let mut session = Session::start(two_player_config(), local_devices(), &mut allocator, Box::new(NullHost));
    let mouse = session.local_devices().mouse.unwrap();
    let targets = session.router().unwrap().targets().clone();
    let (mouse_0, mouse_1) = (targets[&0].mouse, targets[&1].mouse);
    let mut layout = side_by_side();

    layout.set_pointer(Some([400.0, 300.0]));
    session.tick(&layout);
    session.handle_event(&RawEvent::mouse(
        mouse,
        0.0,
        MouseState::at([400.0, 300.0]).with_buttons(MouseButtons::LEFT),
    ));

    layout.set_pointer(Some([1000.0, 300.0]));
    session.tick(&layout);
    for (time, x) in [(0.1, 1000.0), (0.2, 1010.0), (0.3, 1020.0)] {
        session.handle_event(&RawEvent::mouse(
            mouse,
            time,
            MouseState::at([x, 300.0])
                .with_buttons(MouseButtons::LEFT)
                .with_delta([10.0, 0.0]),
        ));
    }

    let devices = session.input().devices();
    let state_0 = devices.get(mouse_0).unwrap().mouse_state().unwrap();
    assert!(state_0.buttons.is_empty());
    assert_eq!(state_0.delta, [0.0, 0.0]);
    assert_eq!(state_0.position, [400.0, 300.0], "no further movement on the old display");

    let state_1 = devices.get(mouse_1).unwrap().mouse_state().unwrap();
    assert_eq!(state_1.position, [1020.0, 300.0]);
    assert_eq!(state_1.display_index, 1);
    assert!(state_1.buttons.is_empty(), "the drag started on the other display");
}

#[test]
fn test_duplicate_graphic_raycasters_are_replaced() {
    let mut allocator = UserIndexAllocator::new();
    let mut session = Session::start(two_player_config(), local_devices(), &mut allocator, Box::new(NullHost));
    let user = session.players()[0].user;

    let make = |mask: u32, blocking: BlockingObjects| {
        SceneRaycaster::Graphic(GraphicRaycaster::new(
            ScreenCamera::new(0),
            Arc::new(Canvas::new(10.0).with_graphic(Graphic::new(1, Rect::new(0.0, 0.0, 100.0, 100.0), 0))),
            GraphicRaycasterSettings {
                blocking_mask: LayerMask(mask),
                blocking_objects: blocking,
                ignore_reversed_graphics: true,
            },
        ))
    };
    let hierarchy = session
        .hierarchy("Player 1")
        .unwrap()
        .with_raycaster(make(0b0110, BlockingObjects::THREE_D))
        .with_raycaster(make(0b0001, BlockingObjects::TWO_D));
    let installed = session.install_raycasters(vec![hierarchy], Vec::new());

    let player = installed.player(user).unwrap();
    assert_eq!(player.len(), 1);
    let graphic = player.graphic.as_ref().unwrap();
    assert_eq!(graphic.owner(), Some(user));
    assert_eq!(graphic.inner().settings().blocking_mask, LayerMask(0b0110));
    assert_eq!(graphic.inner().settings().blocking_objects, BlockingObjects::THREE_D);
    assert!(session.report().has_errors(), "replacement is reported loudly with two players");
}

#[test]
fn test_session_raycast_filters_by_player() {
    let mut allocator = UserIndexAllocator::new();
    let mut session = Session::start(two_player_config(), local_devices(), &mut allocator, Box::new(NullHost));
    let targets = session.router().unwrap().targets().clone();
    let scene = sphere_scene();

    let hierarchies = session
        .players()
        .iter()
        .map(|player| {
            PlayerHierarchy::new(&player.name, player.user).with_raycaster(SceneRaycaster::Physics(
                PhysicsRaycaster::new(ScreenCamera::new(0), Arc::clone(&scene), PhysicsRaycasterSettings::default()),
            ))
        })
        .collect();
    session.install_raycasters(hierarchies, Vec::new());

    let hits = session.raycast(&PointerEvent::from_device(targets[&1].mouse, Vec2::new(10.0, 10.0), 0));
    assert_eq!(hits.len(), 1, "only player 2's raycaster answers");
}

#[test]
fn test_text_reaches_focused_player() {
    let mut allocator = UserIndexAllocator::new();
    let mut session = Session::start(two_player_config(), local_devices(), &mut allocator, Box::new(NullHost));
    let keyboard = session.local_devices().keyboard.unwrap();
    let mut layout = side_by_side();

    layout.set_pointer(Some([1200.0, 10.0]));
    session.tick(&layout);
    for (time, character) in [(0.0, 'h'), (0.1, 'i')] {
        session.handle_event(&RawEvent::text(keyboard, time, character));
    }
    session.handle_event(&RawEvent::keyboard(
        keyboard,
        0.2,
        KeyboardState::with_keys([KeyCode::Letter('w')]),
    ));

    let (first, second) = (session.players()[0].user, session.players()[1].user);
    assert_eq!(session.text_input(second).unwrap(), "hi");
    assert_eq!(session.text_input(second).unwrap(), "");
    assert_eq!(session.text_input(first).unwrap(), "");
}

#[test]
fn test_action_reference_resolves_per_user() {
    let mut allocator = UserIndexAllocator::new();
    let mut session = Session::start(two_player_config(), local_devices(), &mut allocator, Box::new(NullHost));
    let (first, second) = (session.players()[0].user, session.players()[1].user);

    let reference = ActionReference::find(session.actions(first).unwrap().unwrap(), "m_Fire").unwrap();
    session
        .actions_mut(second)
        .unwrap()
        .unwrap()
        .find_by_id_mut(reference.action)
        .unwrap()
        .enable();

    assert!(!session.resolve(first, &reference).unwrap().is_enabled());
    assert!(session.resolve(second, &reference).unwrap().is_enabled());
    assert_eq!(session.resolve(second, &reference).unwrap().name(), "Fire");
}

#[derive(Clone, Default)]
struct CountingHost {
    closed: Rc<Cell<u32>>,
}

impl Host for CountingHost {
    fn close_lobby(&mut self) {
        self.closed.set(self.closed.get() + 1);
    }
}

#[test]
fn test_close_lobby_reaches_host() {
    let host = CountingHost::default();
    let closed = Rc::clone(&host.closed);
    let mut allocator = UserIndexAllocator::new();
    let mut session = Session::start(SessionConfig::builtin("test"), local_devices(), &mut allocator, Box::new(host));
    session.close_lobby();
    assert_eq!(closed.get(), 1);
}

#[test]
fn test_user_indices_span_sessions() {
    let mut allocator = UserIndexAllocator::new();
    let first = Session::start(two_player_config(), local_devices(), &mut allocator, Box::new(NullHost));
    drop(first);
    let second = Session::start(two_player_config(), local_devices(), &mut allocator, Box::new(NullHost));
    let indices: Vec<u32> = second.players().iter().map(|player| player.user.index()).collect();
    assert_eq!(indices, vec![2, 3]);
}

#[test]
fn test_drop_releases_session_devices() {
    let mut allocator = UserIndexAllocator::new();
    let mut session = Session::start(two_player_config(), local_devices(), &mut allocator, Box::new(NullHost));
    let created = session.session_devices().to_vec();
    assert_eq!(created.len(), 4);
    session.shutdown();
    for device in created {
        assert!(!session.input().devices().contains(device));
    }
    let local = session.local_devices();
    assert!(session.input().devices().contains(local.mouse.unwrap()));
}

#[test]
fn test_hierarchy_without_user_is_a_setup_error() {
    let mut allocator = UserIndexAllocator::new();
    let mut session = Session::start(SessionConfig::builtin("test"), local_devices(), &mut allocator, Box::new(NullHost));
    assert!(!session.report().has_errors());

    let orphan = PlayerHierarchy::new("Ghost", UserId(99)).with_raycaster(SceneRaycaster::Physics(
        PhysicsRaycaster::new(ScreenCamera::new(0), sphere_scene(), PhysicsRaycasterSettings::default()),
    ));
    session.install_raycasters(vec![orphan], Vec::new());

    assert!(session.report().has_errors());
    let expected = InputError::UnknownUser(UserId(99)).to_string();
    assert!(
        session.report().issues().iter().any(|issue| issue.message == expected),
        "unknown user is named in the report"
    );
}
