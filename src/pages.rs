use actix_web::web;
use uuid::Uuid;

use crate::{auth::Actor, error::HrError};

#[cfg(test)]
macro_rules! test_app {
    ($db:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($db))
                .app_data(actix_web::web::Data::new(crate::auth::Authority::new(crate::pages::tests::SECRET)))
                .app_data(actix_web::web::Data::new(crate::hash::IntegrityHasher::default()))
                .configure(crate::pages::config)
        )
    };
}

mod attendance;
mod leave;
mod payroll;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(web::scope("/attendance")
            .configure(attendance::config))
        .service(web::scope("/leave")
            .configure(leave::config))
        .service(web::scope("/payroll")
            .configure(payroll::config));
}

/// The employee record behind a self-service call
fn own_employee(actor: &Actor) -> Result<Uuid, HrError> {
    actor.employee_id
        .ok_or_else(|| HrError::InvalidInput("caller is not linked to an employee".to_owned()))
}

#[cfg(test)]
pub(crate) mod tests {
    use actix_web::{body::MessageBody, dev::ServiceResponse};

    use crate::auth::{tests::actor_with, Authority, Role};

    pub(crate) const SECRET: &[u8] = b"secret";

    pub(crate) fn bearer(role: Role) -> (&'static str, String) {
        let token = Authority::new(SECRET).issue_for(&actor_with(role)).unwrap();

        ("Authorization", format!("Bearer {token}"))
    }

    pub(crate) fn unlinked_bearer(role: Role) -> (&'static str, String) {
        let mut actor = actor_with(role);
        actor.employee_id = None;
        let token = Authority::new(SECRET).issue_for(&actor).unwrap();

        ("Authorization", format!("Bearer {token}"))
    }

    pub(crate) async fn body_text(response: ServiceResponse) -> String {
        let bytes = response.into_body().try_into_bytes().unwrap();

        String::from_utf8(bytes.to_vec()).unwrap()
    }
}
