use crate::{
    auth::{
        auth::AuthUser,
        jwt::generate_access_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    model::{role::Role, student::Student},
    models::{LoginReqDto, RegisterReq, StudentCredentials},
};
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

/// Register a student account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Student registered"),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Student ID already exists")
    ),
    tag = "Auth"
)]
pub async fn register(req: web::Json<RegisterReq>, pool: web::Data<MySqlPool>) -> impl Responder {
    let student_id = req.student_id.trim();
    let name = req.name.trim();

    if student_id.is_empty() || name.is_empty() || req.password.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Student ID, name and password must not be empty"
        }));
    }

    let hashed = match hash_password(&req.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "Failed to hash password");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let result = sqlx::query(
        r#"
        INSERT INTO student (student_id, name, team_id, password, role_id)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(student_id)
    .bind(name)
    .bind(req.team_id)
    .bind(hashed)
    .bind(Role::Student as u8)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            info!(student_id, "Student registered");
            HttpResponse::Created().json(json!({
                "message": "Student registered successfully"
            }))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return HttpResponse::Conflict().json(json!({
                        "error": "Student ID already exists"
                    }));
                }
            }

            error!(error = %e, student_id, "Failed to register student");
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to register student"
            }))
        }
    }
}

#[derive(Serialize)]
struct LoginResponse {
    access_token: String,
    student_id: String,
    name: String,
    role: u8,
}

/// Exchange credentials for an access token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Access token issued", body = Object, example = json!({
            "access_token": "eyJhbGciOi...",
            "student_id": "M1234567",
            "name": "Lin Wei",
            "role": 2
        })),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(student_id = %user.student_id)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    if user.student_id.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty student id or password");
        return HttpResponse::BadRequest().body("Student ID or password required");
    }

    let db_user = match sqlx::query_as::<_, StudentCredentials>(
        r#"
        SELECT student_id, name, password, role_id
        FROM student
        WHERE student_id = ?
        "#,
    )
    .bind(user.student_id.trim())
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(found)) => found,
        Ok(None) => {
            info!("Invalid credentials: student not found");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching student");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    debug!("Password verified, issuing access token");

    let access_token = match generate_access_token(
        &db_user.student_id,
        &db_user.name,
        db_user.role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    ) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to sign access token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = sqlx::query("UPDATE student SET last_login_at = NOW() WHERE student_id = ?")
        .bind(&db_user.student_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
        // intentionally not failing login
    }

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse {
        access_token,
        student_id: db_user.student_id,
        name: db_user.name,
        role: db_user.role_id,
    })
}

/// Profile of the calling student
#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Student profile", body = Student),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Student no longer exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let student = sqlx::query_as::<_, Student>(
        r#"
        SELECT student_id, name, team_id, role_id, last_login_at
        FROM student
        WHERE student_id = ?
        "#,
    )
    .bind(&auth.student_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, student_id = %auth.student_id, "Failed to fetch profile");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match student {
        Some(s) => Ok(HttpResponse::Ok().json(s)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Student not found"
        }))),
    }
}
