pub mod report_job;
pub mod scheduler;

pub use report_job::PopularityReportJob;
pub use scheduler::{CronTrigger, ManualTicker, ManualTrigger, ScheduleHandle, Scheduler, Trigger};
