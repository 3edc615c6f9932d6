//! Pending tool permission requests.

use tap_core::{tap_ref, tap_state, Callback, Resource, StateSetter};
use tap_store::{store, tap_actions, Actions, Store, StoreOutput};

use crate::command::Decision;

#[derive(Clone, Debug, PartialEq)]
pub struct NewPermissionRequest {
    pub tool_call_id: String,
    pub tool_name: String,
    pub input: String,
    pub on_decision: Callback<Decision>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PermissionRequest {
    pub id: String,
    pub tool_call_id: String,
    pub tool_name: String,
    pub input: String,
    pub on_decision: Callback<Decision>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PermissionsState {
    pub pending: Vec<PermissionRequest>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PermissionsActions {
    /// Queue a request and return its id.
    pub add_request: Callback<NewPermissionRequest, String>,
    /// Remove the request with this id and deliver the decision. Returns
    /// whether the request was pending.
    pub resolve: Callback<(String, Decision), bool>,
    /// Like `resolve`, looking the request up by tool call id.
    pub resolve_tool_call: Callback<(String, Decision), bool>,
}

pub type PermissionsStore = Store<PermissionsState, Actions<PermissionsActions>>;

pub fn permissions(_: ()) -> StoreOutput<PermissionsState, Actions<PermissionsActions>> {
    let (state, set_state) = tap_state(PermissionsState::default);
    let next_id = tap_ref(|| 1_u64);

    let add_request = {
        let set_state = set_state.clone();
        Callback::new(move |request: NewPermissionRequest| {
            let id = format!("perm-{}", next_id.replace(next_id.get() + 1));
            log::debug!(
                "permission {id} requested for `{}` ({})",
                request.tool_name,
                request.tool_call_id
            );
            let entry = PermissionRequest {
                id: id.clone(),
                tool_call_id: request.tool_call_id,
                tool_name: request.tool_name,
                input: request.input,
                on_decision: request.on_decision,
            };
            set_state.update(|state| {
                let mut pending = state.pending.clone();
                pending.push(entry);
                PermissionsState { pending }
            });
            id
        })
    };
    let resolve = {
        let set_state = set_state.clone();
        Callback::new(move |(id, decision): (String, Decision)| {
            take_request(&set_state, |request| request.id == id, decision)
        })
    };
    let resolve_tool_call = Callback::new(move |(tool_call_id, decision): (String, Decision)| {
        take_request(
            &set_state,
            |request| request.tool_call_id == tool_call_id,
            decision,
        )
    });

    let actions = tap_actions(PermissionsActions {
        add_request,
        resolve,
        resolve_tool_call,
    });
    StoreOutput::new(state, actions)
}

fn take_request(
    set_state: &StateSetter<PermissionsState>,
    matches: impl Fn(&PermissionRequest) -> bool,
    decision: Decision,
) -> bool {
    let mut state = set_state.current();
    let Some(index) = state.pending.iter().position(matches) else {
        return false;
    };
    let request = state.pending.remove(index);
    set_state.set(state);
    log::debug!("permission {} resolved: {decision:?}", request.id);
    request.on_decision.call(decision);
    true
}

/// The permissions store as a resource.
pub fn permissions_store() -> Resource<(), PermissionsStore> {
    store(permissions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tap_testing::{init_logging, CallLog, ResourceTester};

    fn request(tool_call_id: &str, decisions: &CallLog) -> NewPermissionRequest {
        let decisions = decisions.clone();
        let call = tool_call_id.to_owned();
        NewPermissionRequest {
            tool_call_id: tool_call_id.to_owned(),
            tool_name: "shell".to_owned(),
            input: "ls".to_owned(),
            on_decision: Callback::new(move |decision: Decision| {
                decisions.push(format!("{call}: {decision:?}"))
            }),
        }
    }

    #[test]
    fn requests_get_sequential_ids() {
        init_logging();
        let tester = ResourceTester::mount(permissions_store().element(())).expect("mount");
        let permissions = tester.state();
        let decisions = CallLog::new();
        let add = permissions.actions().get().add_request;

        assert_eq!(add.call(request("call-1", &decisions)), "perm-1");
        assert_eq!(add.call(request("call-2", &decisions)), "perm-2");
        tester.settle().expect("settle");

        let pending: Vec<_> = permissions
            .get_state()
            .pending
            .into_iter()
            .map(|request| request.id)
            .collect();
        assert_eq!(pending, ["perm-1", "perm-2"]);
    }

    #[test]
    fn resolving_removes_the_request_and_delivers_the_decision() {
        init_logging();
        let tester = ResourceTester::mount(permissions_store().element(())).expect("mount");
        let permissions = tester.state();
        let decisions = CallLog::new();
        let actions = permissions.actions().get();
        let id = actions.add_request.call(request("call-1", &decisions));
        actions.add_request.call(request("call-2", &decisions));

        assert!(actions.resolve.call((id.clone(), Decision::Reject)));
        assert!(!actions.resolve.call((id, Decision::Approve)));
        assert!(actions
            .resolve_tool_call
            .call(("call-2".to_owned(), Decision::Approve)));
        tester.settle().expect("settle");

        assert_eq!(decisions.entries(), ["call-1: Reject", "call-2: Approve"]);
        assert!(permissions.get_state().pending.is_empty());
    }
}
