use actix_web::{
    get, post,
    web::{Data, Path, ServiceConfig, scope},
    HttpResponse,
};
use actix_web_validator::Json;

use crate::api::identity::CallerIdentity;

use super::dto::{JobResponse, SubmitJobRequest};
use super::models::JobStatus;
use super::service::{JobService, ServiceError};

#[post("")]
async fn submit_job(
    service: Data<JobService>,
    caller: CallerIdentity,
    payload: Json<SubmitJobRequest>,
) -> Result<HttpResponse, ServiceError> {
    let job = service.submit_job(caller.id(), payload.into_inner()).await?;
    // A remote rejection still creates the (failed) record; the envelope
    // must not claim otherwise.
    let message = if job.status == JobStatus::Failed {
        "Job rejected by the generation service"
    } else {
        "Job accepted"
    };
    Ok(HttpResponse::Created().json(JobResponse {
        message: message.to_string(),
        job,
    }))
}

#[get("/{id}")]
async fn get_job(
    service: Data<JobService>,
    caller: CallerIdentity,
    path: Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let job = service.get_job(caller.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(job))
}

#[get("")]
async fn list_jobs(
    service: Data<JobService>,
    caller: CallerIdentity,
) -> Result<HttpResponse, ServiceError> {
    let jobs = service.list_jobs(caller.id()).await?;
    Ok(HttpResponse::Ok().json(jobs))
}

pub fn job_config(config: &mut ServiceConfig) {
    config.service(
        scope("jobs")
            .service(submit_job)
            .service(list_jobs)
            .service(get_job),
    );
}
