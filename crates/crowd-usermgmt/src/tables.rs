//! Status tables for every Crowd user-management operation.
//!
//! One table per endpoint. Codes not listed fall through to a protocol error.

use crowd_core::outcome::{Disposition, FailureKind, StatusRule, StatusTable};

use Disposition::{Absent, Fail, Success};

/// `GET /non-existent/location`: 404 proves the application authenticated.
pub const AUTH_PING: StatusTable = StatusTable::new(
    "auth_ping",
    &[
        StatusRule::code(404, Success),
        StatusRule::code(401, Absent),
    ],
);

/// `POST /authentication`
pub const AUTHENTICATE_USER: StatusTable = StatusTable::new(
    "authenticate_user",
    &[
        StatusRule::code(200, Success),
        StatusRule::code(400, Fail(FailureKind::AuthenticationFailed)),
    ],
);

/// `POST /session`
pub const CREATE_SESSION: StatusTable = StatusTable::new(
    "create_session",
    &[
        StatusRule::code(201, Success),
        StatusRule::code(400, Fail(FailureKind::AuthenticationFailed)),
    ],
);

/// `POST /session/{token}`: any failure means the token did not validate.
pub const VALIDATE_SESSION: StatusTable = StatusTable::new(
    "validate_session",
    &[
        StatusRule::any_success(Success),
        StatusRule::otherwise(Fail(FailureKind::AuthenticationFailed)),
    ],
);

/// `DELETE /session/{token}`
pub const TERMINATE_SESSION: StatusTable =
    StatusTable::new("terminate_session", &[StatusRule::code(204, Success)]);

/// `POST /user`
pub const CREATE_USER: StatusTable = StatusTable::new(
    "create_user",
    &[
        StatusRule::code(201, Success),
        StatusRule::code(400, Fail(FailureKind::UserAlreadyExists)),
        StatusRule::code(
            403,
            Fail(FailureKind::AuthorizationDenied(
                "application is not allowed to create a new user",
            )),
        ),
    ],
);

/// `DELETE /user`
pub const DELETE_USER: StatusTable = StatusTable::new(
    "delete_user",
    &[
        StatusRule::code(204, Success),
        StatusRule::code(
            403,
            Fail(FailureKind::AuthorizationDenied(
                "application is not allowed to delete user",
            )),
        ),
        StatusRule::code(404, Fail(FailureKind::UserNotFound)),
    ],
);

/// `GET /user?expand=attributes`
pub const GET_USER: StatusTable = StatusTable::new(
    "get_user",
    &[StatusRule::code(200, Success), StatusRule::code(404, Absent)],
);

/// `GET /user`
///
/// Only 2xx counts as success. 3xx never reaches the table because the transport follows
/// redirects, so an unfollowed redirect is treated as absent.
pub const USER_EXISTS: StatusTable = StatusTable::new(
    "user_exists",
    &[
        StatusRule::any_success(Success),
        StatusRule::otherwise(Absent),
    ],
);

/// `POST /group`
///
/// A 403 is an authorization denial, the same as for user creation.
pub const CREATE_GROUP: StatusTable = StatusTable::new(
    "create_group",
    &[
        StatusRule::code(201, Success),
        StatusRule::code(400, Fail(FailureKind::GroupAlreadyExists)),
        StatusRule::code(
            403,
            Fail(FailureKind::AuthorizationDenied(
                "application is not allowed to create a new group",
            )),
        ),
    ],
);

/// `GET /group`
///
/// Only 2xx counts as success. 3xx never reaches the table because the transport follows
/// redirects, so an unfollowed redirect is treated as absent.
pub const GROUP_EXISTS: StatusTable = StatusTable::new(
    "group_exists",
    &[
        StatusRule::any_success(Success),
        StatusRule::otherwise(Absent),
    ],
);

/// `GET /user/group/direct`
pub const USER_DIRECT_GROUPS: StatusTable = StatusTable::new(
    "user_direct_groups",
    &[StatusRule::code(200, Success), StatusRule::code(404, Absent)],
);

/// `GET /user/group/nested`
pub const USER_NESTED_GROUPS: StatusTable = StatusTable::new(
    "user_nested_groups",
    &[StatusRule::code(200, Success), StatusRule::code(404, Absent)],
);

/// `GET /group/user/direct?groupname=`
pub const GROUP_DIRECT_MEMBERS: StatusTable = StatusTable::new(
    "group_direct_members",
    &[StatusRule::code(200, Success), StatusRule::code(404, Absent)],
);

/// `GET /group/user/direct?groupname=&username=`
pub const GROUP_DIRECT_MEMBER: StatusTable = StatusTable::new(
    "group_direct_member",
    &[StatusRule::code(200, Success), StatusRule::code(404, Absent)],
);

/// `GET /group/user/nested`
///
/// Only 2xx counts as success. 3xx never reaches the table because the transport follows
/// redirects, so an unfollowed redirect is treated as absent.
pub const GROUP_NESTED_MEMBERS: StatusTable = StatusTable::new(
    "group_nested_members",
    &[
        StatusRule::any_success(Success),
        StatusRule::otherwise(Absent),
    ],
);

/// `GET /group/child-group/direct`
pub const GROUP_DIRECT_CHILDREN: StatusTable = StatusTable::new(
    "group_direct_children",
    &[StatusRule::code(200, Success), StatusRule::code(404, Absent)],
);

/// `POST /group/user/direct`
pub const ADD_USER_TO_GROUP: StatusTable = StatusTable::new(
    "add_user_to_group",
    &[
        StatusRule::code(201, Success),
        StatusRule::code(400, Fail(FailureKind::UserNotFound)),
        StatusRule::code(404, Fail(FailureKind::GroupNotFound)),
        StatusRule::code(409, Fail(FailureKind::UserAlreadyExists)),
    ],
);

/// `POST /group/child-group/direct`: 400 means the child is missing, 404 the parent.
pub const ADD_CHILD_GROUP: StatusTable = StatusTable::new(
    "add_child_group",
    &[
        StatusRule::code(201, Success),
        StatusRule::code(400, Fail(FailureKind::GroupNotFound)),
        StatusRule::code(404, Fail(FailureKind::GroupNotFound)),
    ],
);

/// `DELETE /group/user/direct`
pub const REMOVE_USER_FROM_GROUP: StatusTable = StatusTable::new(
    "remove_user_from_group",
    &[
        StatusRule::code(204, Success),
        StatusRule::code(404, Fail(FailureKind::MissingMember)),
    ],
);

/// `GET /group/membership` (XML)
pub const GROUP_MEMBERSHIPS: StatusTable = StatusTable::new(
    "group_memberships",
    &[StatusRule::code(200, Success), StatusRule::code(404, Absent)],
);
