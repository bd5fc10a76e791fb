use anyhow::Context;
use attendx::api::Dashboard;
use attendx::export::{ExportFile, ExportFormat};
use attendx::models::{AttendanceStatus, Class, LOW_ATTENDANCE_THRESHOLD};
use attendx::reports::{filter_stats, rank_warnings, DepartmentFilter, ReportSummary};
use attendx::validation::{ClassForm, MessageForm, StudentForm};
use attendx::{AttendX, Error};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[clap(name = "attendx", version)]
#[clap(about = "Attendance dashboard for schools and colleges", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// Admin account email
    #[clap(long, env = "ATTENDX_EMAIL")]
    email: String,

    /// Admin account password
    #[clap(long, env = "ATTENDX_PASSWORD", hide_env_values = true)]
    password: String,

    /// Output debug logs to stderr
    #[clap(long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Summary counts, today's classes and the worst warnings
    Overview,
    /// List registered students
    Students {
        /// Only students whose name, roll number or department contains this
        #[clap(long)]
        search: Option<String>,
    },
    /// Register a student
    AddStudent {
        #[clap(long)]
        name: String,
        #[clap(long)]
        roll_number: String,
        #[clap(long)]
        department: String,
        #[clap(long)]
        semester: i32,
        #[clap(long, default_value = "")]
        email: String,
        #[clap(long, default_value = "")]
        phone: String,
    },
    /// List scheduled classes
    Classes {
        /// Only today's classes
        #[clap(long)]
        today: bool,
        #[clap(long)]
        search: Option<String>,
    },
    /// Schedule a class
    Schedule {
        #[clap(long)]
        subject: String,
        #[clap(long)]
        department: String,
        #[clap(long)]
        semester: i32,
        /// YYYY-MM-DD
        #[clap(long)]
        date: String,
        /// HH:MM
        #[clap(long)]
        start: String,
        /// HH:MM
        #[clap(long)]
        end: String,
    },
    /// Mark attendance for a class. Without flags the sheet is only shown.
    Mark {
        class_id: Uuid,
        #[clap(long, conflicts_with = "all_absent")]
        all_present: bool,
        #[clap(long)]
        all_absent: bool,
        /// Students to mark present, applied after the bulk flags
        #[clap(long, num_args = 1..)]
        present: Vec<Uuid>,
        /// Students to mark absent, applied after the bulk flags
        #[clap(long, num_args = 1..)]
        absent: Vec<Uuid>,
    },
    /// Students below the attendance threshold
    Warnings,
    /// Attendance statistics with a summary
    Report {
        /// "All" or an exact department name
        #[clap(long, default_value = "All")]
        department: DepartmentFilter,
    },
    /// Write the statistics table to a file
    Export {
        /// csv or xls
        #[clap(long, default_value = "csv")]
        format: ExportFormat,
        #[clap(long, default_value = "All")]
        department: DepartmentFilter,
        /// Directory to write into
        #[clap(long, default_value = ".")]
        out: PathBuf,
    },
    /// List sent messages
    Messages,
    /// Send an announcement
    Send {
        #[clap(long)]
        title: String,
        #[clap(long)]
        body: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("attendx error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    let app = AttendX::from_env().context("failed to load configuration")?;
    let state = app
        .sign_in(&cli.email, &cli.password)
        .await
        .context("sign-in failed")?;
    let dashboard = app.dashboard(&state)?;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Overview => overview(&dashboard, today).await?,
        Commands::Students { search } => {
            let students = dashboard
                .students()
                .search(search.as_deref().unwrap_or_default())
                .await?;
            for s in &students {
                println!(
                    "{}  {:<10} {:<24} {:<24} sem {}",
                    s.id, s.roll_number, s.name, s.department, s.semester
                );
            }
            println!("{} student(s)", students.len());
        }
        Commands::AddStudent {
            name,
            roll_number,
            department,
            semester,
            email,
            phone,
        } => {
            let form = StudentForm {
                name,
                roll_number,
                department,
                semester,
                email,
                phone,
            };
            let student = dashboard.students().create(&form).await?;
            println!("{}", student.id);
        }
        Commands::Classes { today: only_today, search } => {
            let classes = if only_today {
                dashboard.classes().today(today).await?
            } else {
                dashboard
                    .classes()
                    .search(search.as_deref().unwrap_or_default())
                    .await?
            };
            for class in &classes {
                print_class(class);
            }
            println!("{} class(es)", classes.len());
        }
        Commands::Schedule {
            subject,
            department,
            semester,
            date,
            start,
            end,
        } => {
            let form = ClassForm {
                subject_name: subject,
                department,
                semester,
                class_date: date,
                start_time: start,
                end_time: end,
            };
            let class = dashboard.classes().create(&form).await?;
            println!("{}", class.id);
        }
        Commands::Mark {
            class_id,
            all_present,
            all_absent,
            present,
            absent,
        } => {
            let mut sheet = dashboard.open_attendance(class_id).await?;
            if all_present {
                sheet.mark_all_present();
            }
            if all_absent {
                sheet.mark_all_absent();
            }
            for id in &present {
                if !sheet.set(*id, AttendanceStatus::Present) {
                    eprintln!("{} is not eligible for this class, skipped", id);
                }
            }
            for id in &absent {
                if !sheet.set(*id, AttendanceStatus::Absent) {
                    eprintln!("{} is not eligible for this class, skipped", id);
                }
            }

            print_class(sheet.class());
            for (student, status) in sheet.rows() {
                println!("  {:<10} {:<24} {}", student.roll_number, student.name, status);
            }
            println!("{}/{} present", sheet.present_count(), sheet.len());

            let edited = all_present || all_absent || !present.is_empty() || !absent.is_empty();
            if edited {
                let saved = dashboard.attendance().save(&sheet).await?;
                println!("saved {} record(s)", saved.len());
            }
        }
        Commands::Warnings => {
            let warnings = rank_warnings(dashboard.attendance().low_attendance().await?);
            if warnings.is_empty() {
                println!(
                    "No students are currently below the {}% attendance threshold.",
                    LOW_ATTENDANCE_THRESHOLD
                );
            }
            for entry in &warnings {
                let w = &entry.warning;
                println!(
                    "{:<10} {:<24} {:>6.2}%  {}",
                    w.roll_number,
                    w.student_name,
                    w.attendance_percentage,
                    entry.label()
                );
            }
        }
        Commands::Report { department } => {
            let stats = filter_stats(&dashboard.attendance().stats().await?, &department);
            for s in &stats {
                println!(
                    "{:<10} {:<24} {:>3}/{:<3} {:>6.2}%  {}",
                    s.roll_number,
                    s.student_name,
                    s.classes_attended,
                    s.total_classes,
                    s.attendance_percentage,
                    s.standing()
                );
            }
            let summary = ReportSummary::from_stats(&stats);
            println!(
                "{} student(s) in {}, average {}%, {} below threshold",
                summary.students, department, summary.average_attendance, summary.low_attendance
            );
        }
        Commands::Export {
            format,
            department,
            out,
        } => {
            let stats = filter_stats(&dashboard.attendance().stats().await?, &department);
            let file = ExportFile::new(format, &stats, today);
            let path = file.write_to(&out)?;
            println!("{}", path.display());
        }
        Commands::Messages => {
            for m in dashboard.messages().list().await? {
                println!("[{}] {}\n  {}", m.sent_at.format("%Y-%m-%d %H:%M"), m.title, m.message);
            }
        }
        Commands::Send { title, body } => {
            let form = MessageForm {
                title,
                message: body,
            };
            dashboard.messages().send(&form).await?;
        }
    }

    Ok(())
}

async fn overview(dashboard: &Dashboard, today: NaiveDate) -> Result<(), Error> {
    let overview = dashboard.overview(today).await?;
    let stats = &overview.stats;
    println!("Students            {}", stats.total_students);
    println!("Classes             {}", stats.total_classes);
    println!("Classes today       {}", stats.classes_today);
    println!("Low attendance      {}", stats.low_attendance_count);
    println!("Average attendance  {}%", stats.average_attendance);

    println!("\nToday's classes");
    for class in &overview.todays_classes {
        print_class(class);
    }
    println!("\nLow attendance");
    for w in &overview.warnings {
        println!("  {:<10} {:<24} {:.2}%", w.roll_number, w.student_name, w.attendance_percentage);
    }
    Ok(())
}

fn print_class(class: &Class) {
    println!(
        "{}  {}  {}  {:<24} {} sem {}",
        class.id,
        class.class_date,
        class.time_range(),
        class.subject_name,
        class.department,
        class.semester
    );
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let level = if debug { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("ATTENDX_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
