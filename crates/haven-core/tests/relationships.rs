//! End-to-end relationship behaviour against an in-memory store.

use std::sync::Arc;
use std::thread;

use haven_core::mail::RecordingMailer;
use haven_core::push::RecordingPushGateway;
use haven_core::{Actor, CoreError, Filter, Haven, NewRequest};
use haven_shared::{CheckInStatus, FamilyRole, PushRoute, RelationshipKind, RequestStatus};

struct World {
    haven: Haven,
    mailer: Arc<RecordingMailer>,
    push: Arc<RecordingPushGateway>,
}

impl World {
    fn new() -> Self {
        let mailer = Arc::new(RecordingMailer::new());
        let push = Arc::new(RecordingPushGateway::new());
        let haven = Haven::in_memory()
            .unwrap()
            .with_mailer(mailer.clone())
            .with_push_gateway(push.clone());
        Self {
            haven,
            mailer,
            push,
        }
    }

    fn member(&self, email: &str, name: &str) -> Actor {
        self.haven.register(email, "secret1", name).unwrap();
        let token = self.mailer.last_token_for(email).unwrap();
        self.haven.verify_email(&token).unwrap();
        let session = self.haven.sign_in(email, "secret1").unwrap();
        self.haven.authenticate(&session.token).unwrap()
    }

    fn connect(&self, from: &Actor, to: &Actor, new: NewRequest) {
        let request = self.haven.submit_request(from, new).unwrap();
        self.haven.accept(to, request.id).unwrap();
    }
}

#[test]
fn no_self_linking_for_any_kind() {
    let w = World::new();
    let alice = w.member("alice@example.com", "Alice");

    for new in [
        NewRequest::friend("alice@example.com"),
        NewRequest::family("ALICE@example.com", "Sibling"),
    ] {
        assert!(matches!(
            w.haven.submit_request(&alice, new),
            Err(CoreError::SelfReference)
        ));
    }
    assert!(w.haven.pending_outgoing(&alice, None).unwrap().is_empty());
}

#[test]
fn duplicate_pending_request_is_suppressed() {
    let w = World::new();
    let alice = w.member("alice@example.com", "Alice");
    let bob = w.member("bob@example.com", "Bob");

    w.haven
        .submit_request(&alice, NewRequest::friend("bob@example.com"))
        .unwrap();
    assert!(matches!(
        w.haven
            .submit_request(&alice, NewRequest::friend("bob@example.com")),
        Err(CoreError::DuplicateRequest)
    ));
    assert_eq!(w.haven.pending_incoming(&bob, None).unwrap().len(), 1);
    assert_eq!(
        w.haven.notifications(&bob, Filter::All).unwrap().len(),
        1
    );
}

#[test]
fn accepted_pair_blocks_new_requests_both_ways() {
    let w = World::new();
    let alice = w.member("alice@example.com", "Alice");
    let bob = w.member("bob@example.com", "Bob");
    w.connect(&alice, &bob, NewRequest::friend("bob@example.com"));

    assert!(matches!(
        w.haven
            .submit_request(&alice, NewRequest::friend("bob@example.com")),
        Err(CoreError::AlreadyConnected)
    ));
    assert!(matches!(
        w.haven
            .submit_request(&bob, NewRequest::friend("alice@example.com")),
        Err(CoreError::AlreadyConnected)
    ));
}

#[test]
fn accept_creates_exactly_one_edge_each_way() {
    let w = World::new();
    let alice = w.member("alice@example.com", "Alice");
    let bob = w.member("bob@example.com", "Bob");

    assert!(w.haven.contacts(&alice, None).unwrap().is_empty());
    assert!(w.haven.contacts(&bob, None).unwrap().is_empty());

    w.connect(&alice, &bob, NewRequest::friend("bob@example.com"));

    let a = w.haven.contacts(&alice, None).unwrap();
    let b = w.haven.contacts(&bob, None).unwrap();
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
    assert_eq!((a[0].owner_id, a[0].target_id), (alice.uid, bob.uid));
    assert_eq!((b[0].owner_id, b[0].target_id), (bob.uid, alice.uid));
    assert!(a[0].relationship.is_none() && b[0].relationship.is_none());
}

#[test]
fn reciprocal_labels_for_every_selectable_role() {
    let w = World::new();
    let alice = w.member("alice@example.com", "Alice");

    for (i, role) in FamilyRole::SELECTABLE.iter().enumerate() {
        let email = format!("relative{i}@example.com");
        let relative = w.member(&email, &format!("Relative {i}"));
        w.connect(&alice, &relative, NewRequest::family(&email, role.label()));

        let forward = w
            .haven
            .contacts(&alice, Some(RelationshipKind::Family))
            .unwrap()
            .into_iter()
            .find(|e| e.target_id == relative.uid)
            .unwrap();
        let back = w.haven.contacts(&relative, None).unwrap();

        assert_eq!(forward.relationship, Some(*role));
        assert_eq!(back[0].relationship, Some(role.reciprocal()));
        assert_eq!(role.reciprocal().reciprocal(), *role);
    }

    for fixed in [
        FamilyRole::Sibling,
        FamilyRole::Spouse,
        FamilyRole::Cousin,
        FamilyRole::Other,
    ] {
        assert_eq!(fixed.reciprocal(), fixed);
    }
}

#[test]
fn resolved_requests_are_terminal() {
    let w = World::new();
    let alice = w.member("alice@example.com", "Alice");
    let bob = w.member("bob@example.com", "Bob");
    let cara = w.member("cara@example.com", "Cara");

    let accepted = w
        .haven
        .submit_request(&alice, NewRequest::friend("bob@example.com"))
        .unwrap();
    w.haven.accept(&bob, accepted.id).unwrap();
    let pushes = w.push.sent().len();

    for second in [w.haven.accept(&bob, accepted.id), w.haven.reject(&bob, accepted.id)] {
        assert!(matches!(second, Err(CoreError::RequestAlreadyResolved(_))));
    }
    assert_eq!(w.haven.contacts(&alice, None).unwrap().len(), 1);
    assert_eq!(w.haven.notifications(&alice, Filter::All).unwrap().len(), 1);
    assert_eq!(w.push.sent().len(), pushes);

    let rejected = w
        .haven
        .submit_request(&alice, NewRequest::friend("cara@example.com"))
        .unwrap();
    w.haven.reject(&cara, rejected.id).unwrap();
    assert!(matches!(
        w.haven.accept(&cara, rejected.id),
        Err(CoreError::RequestAlreadyResolved(_))
    ));
    assert!(w.haven.contacts(&cara, None).unwrap().is_empty());
}

#[test]
fn check_in_fans_out_to_every_contact_once() {
    let w = World::new();
    let alice = w.member("alice@example.com", "Alice");
    let mut contacts = Vec::new();
    for i in 0..4 {
        let email = format!("c{i}@example.com");
        let contact = w.member(&email, &format!("C{i}"));
        w.connect(&alice, &contact, NewRequest::friend(&email));
        w.haven.clear_all(&contact).unwrap();
        contacts.push(contact);
    }
    let outsider = w.member("outsider@example.com", "Outsider");

    w.haven
        .check_in(&alice, CheckInStatus::Warning, "Evacuation Center 2")
        .unwrap();

    for contact in &contacts {
        let inbox = w.haven.notifications(contact, Filter::All).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].user_id, contact.uid);
        assert_eq!(
            inbox[0].message,
            "Alice checked in as NEEDS ATTENTION from Evacuation Center 2"
        );
    }
    assert!(w
        .haven
        .notifications(&outsider, Filter::All)
        .unwrap()
        .is_empty());

    let check_in_pushes: Vec<_> = w
        .push
        .sent()
        .into_iter()
        .filter(|m| m.route == PushRoute::CheckIn)
        .collect();
    assert_eq!(check_in_pushes.len(), contacts.len());
}

#[test]
fn only_the_recipient_may_resolve() {
    let w = World::new();
    let alice = w.member("alice@example.com", "Alice");
    w.member("bob@example.com", "Bob");
    let mallory = w.member("mallory@example.com", "Mallory");

    let request = w
        .haven
        .submit_request(&alice, NewRequest::friend("bob@example.com"))
        .unwrap();

    for actor in [&alice, &mallory] {
        assert!(matches!(
            w.haven.accept(actor, request.id),
            Err(CoreError::NotAuthorized)
        ));
        assert!(matches!(
            w.haven.reject(actor, request.id),
            Err(CoreError::NotAuthorized)
        ));
    }
    let outgoing = w.haven.pending_outgoing(&alice, None).unwrap();
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].status, RequestStatus::Pending);
}

#[test]
fn concurrent_accepts_resolve_once() {
    let w = World::new();
    let alice = w.member("alice@example.com", "Alice");
    let bob = w.member("bob@example.com", "Bob");
    let request = w
        .haven
        .submit_request(&alice, NewRequest::friend("bob@example.com"))
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let haven = w.haven.clone();
            let bob = bob.clone();
            thread::spawn(move || haven.accept(&bob, request.id))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, CoreError::RequestAlreadyResolved(_))));
    assert_eq!(w.haven.contacts(&alice, None).unwrap().len(), 1);
    assert_eq!(w.haven.notifications(&alice, Filter::All).unwrap().len(), 1);
}

#[test]
fn crossing_submit_during_accept_leaves_nothing_pending() {
    let w = World::new();

    for round in 0..12 {
        let alice = w.member(&format!("alice{round}@example.com"), "Alice");
        let bob = w.member(&format!("bob{round}@example.com"), "Bob");
        let request = w
            .haven
            .submit_request(&alice, NewRequest::friend(&format!("bob{round}@example.com")))
            .unwrap();

        let accepting = {
            let haven = w.haven.clone();
            let bob = bob.clone();
            thread::spawn(move || haven.accept(&bob, request.id))
        };
        let submitting = {
            let haven = w.haven.clone();
            let bob = bob.clone();
            let target = format!("alice{round}@example.com");
            thread::spawn(move || haven.submit_request(&bob, NewRequest::friend(&target)))
        };
        accepting.join().unwrap().unwrap();
        match submitting.join().unwrap() {
            Ok(_) | Err(CoreError::AlreadyConnected) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }

        assert_eq!(w.haven.contacts(&alice, None).unwrap().len(), 1);
        assert!(w.haven.pending_outgoing(&bob, None).unwrap().is_empty());
        assert!(w.haven.pending_incoming(&alice, None).unwrap().is_empty());
    }
}

#[test]
fn friend_request_scenario() {
    let w = World::new();
    let alice = w.member("alice@example.com", "Alice");
    let bob = w.member("bob@example.com", "Bob");

    w.haven
        .submit_request(&alice, NewRequest::friend("Bob@Example.com"))
        .unwrap();

    let pending = w
        .haven
        .pending_incoming(&bob, Some(RelationshipKind::Friend))
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].from_user_id, alice.uid);

    w.haven.accept(&bob, pending[0].id).unwrap();

    let a = w.haven.contacts(&alice, None).unwrap();
    let b = w.haven.contacts(&bob, None).unwrap();
    assert!(a.iter().any(|e| e.target_id == bob.uid && e.can_track));
    assert!(b.iter().any(|e| e.target_id == alice.uid && e.can_track));

    let accepted: Vec<_> = w
        .haven
        .notifications(&alice, Filter::All)
        .unwrap()
        .into_iter()
        .filter(|n| n.title == "Friend Request Accepted")
        .collect();
    assert_eq!(accepted.len(), 1);

    let routes: Vec<_> = w.push.sent().into_iter().map(|m| m.route).collect();
    assert_eq!(
        routes,
        vec![PushRoute::FriendRequests, PushRoute::Notifications]
    );
}
