use actix_web::web;

pub mod archive_handlers;
pub mod attendee_handlers;
pub mod meeting_handlers;
pub mod requirement_handlers;
pub mod vote_handlers;

/// Full route table; shared between the server and the API tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/requirement-review-meetings")
            // Archive routes BEFORE /{id} to avoid routing conflict
            .route("/archive/vote-results", web::get().to(archive_handlers::list))
            .route(
                "/archive/vote-results/{archive_id}",
                web::get().to(archive_handlers::read),
            )
            // Meetings
            .route("", web::get().to(meeting_handlers::list))
            .route("", web::post().to(meeting_handlers::create))
            .route("/{id}", web::get().to(meeting_handlers::read))
            .route("/{id}", web::put().to(meeting_handlers::update))
            .route("/{id}", web::delete().to(meeting_handlers::delete))
            .route("/{id}/start", web::post().to(meeting_handlers::start))
            .route("/{id}/end", web::post().to(meeting_handlers::end))
            .route("/{id}/cancel", web::post().to(meeting_handlers::cancel))
            .route(
                "/{id}/pending-voters",
                web::get().to(meeting_handlers::pending_voters),
            )
            // Attendees
            .route("/{id}/attendees", web::get().to(attendee_handlers::list))
            .route("/{id}/attendees", web::post().to(attendee_handlers::create))
            .route(
                "/{id}/attendees/{attendee_id}",
                web::delete().to(attendee_handlers::delete),
            )
            // Review queue
            .route("/{id}/requirements", web::get().to(requirement_handlers::list))
            .route("/{id}/requirements", web::post().to(requirement_handlers::create))
            .route(
                "/{id}/requirements/{req_id}",
                web::put().to(requirement_handlers::update),
            )
            .route(
                "/{id}/requirements/{req_id}",
                web::delete().to(requirement_handlers::delete),
            )
            // Voting
            .route(
                "/{id}/requirements/{req_id}/vote",
                web::post().to(vote_handlers::cast),
            )
            .route(
                "/{id}/requirements/{req_id}/my-vote",
                web::get().to(vote_handlers::my_vote),
            )
            .route(
                "/{id}/requirements/{req_id}/votes",
                web::get().to(vote_handlers::statistics),
            )
            .route(
                "/{id}/requirements/{req_id}/voters",
                web::get().to(vote_handlers::voter_status),
            )
            .route(
                "/{id}/requirements/{req_id}/voters",
                web::patch().to(vote_handlers::update_voters),
            )
            .route(
                "/{id}/requirements/{req_id}/next-voter",
                web::post().to(vote_handlers::next_voter),
            )
            // Per-meeting archives
            .route(
                "/{id}/archive/vote-results",
                web::get().to(archive_handlers::list_for_meeting),
            ),
    );
}
