//! Rotation policy: validated base directory, path template and bucket math
//!
//! A policy is built once from `(base path, file name, interval class,
//! division, max age)` and is immutable afterwards. It answers three
//! questions for the writer and the retention sweeper:
//! - which bucket a wall-clock instant falls into
//! - what file a bucket is written to
//! - which bucket an existing file in the base directory belongs to

use std::fs;
use std::io;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::time::Duration as StdDuration;

use chrono::{
    DateTime, Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime, SubsecRound, Utc,
};
use tracing::debug;

use crate::domain::errors::{ConfigError, ConfigResult};
use crate::domain::models::{IntervalClass, TimeZoneMode};

/// Seconds between `0001-01-01T00:00:00` and the Unix epoch.
///
/// Buckets are counted from year one so that month and year buckets land on
/// the same boundaries as files written by earlier deployments.
const PROLEPTIC_EPOCH_OFFSET_SECS: i64 = 62_135_596_800;

const DEFAULT_DIVISION: &str = "-";

/// Immutable description of where and when log files rotate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    base_path: String,
    file_name: String,
    division: String,
    interval: IntervalClass,
    path_template: String,
    max_age: Option<StdDuration>,
    time_zone: TimeZoneMode,
}

/// Builder for [`RotationPolicy`].
#[derive(Debug, Clone)]
pub struct RotationPolicyBuilder {
    base_path: String,
    file_name: String,
    interval: IntervalClass,
    raw_interval: Option<String>,
    division: String,
    max_age: Option<StdDuration>,
    time_zone: TimeZoneMode,
}

impl RotationPolicyBuilder {
    /// Builder with a day interval, `-` division, UTC and no retention.
    pub fn new(base_path: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            file_name: file_name.into(),
            interval: IntervalClass::Day,
            raw_interval: None,
            division: DEFAULT_DIVISION.to_string(),
            max_age: None,
            time_zone: TimeZoneMode::Utc,
        }
    }

    /// Rotation interval class.
    #[must_use]
    pub fn interval(mut self, interval: IntervalClass) -> Self {
        self.interval = interval;
        self.raw_interval = None;
        self
    }

    /// Textual interval, validated when the policy is built.
    #[must_use]
    pub fn interval_str(mut self, interval: impl Into<String>) -> Self {
        self.raw_interval = Some(interval.into());
        self
    }

    /// Separator placed between timestamp components and before the file name.
    #[must_use]
    pub fn division(mut self, division: impl Into<String>) -> Self {
        self.division = division.into();
        self
    }

    /// Retention for rotated files. `None` or zero keeps them forever.
    #[must_use]
    pub const fn max_age(mut self, max_age: Option<StdDuration>) -> Self {
        self.max_age = max_age;
        self
    }

    /// Clock buckets and file names are computed in.
    #[must_use]
    pub const fn time_zone(mut self, time_zone: TimeZoneMode) -> Self {
        self.time_zone = time_zone;
        self
    }

    /// Validate the inputs, create the base directory and derive the template.
    pub fn build(self) -> ConfigResult<RotationPolicy> {
        if self.base_path.trim().is_empty() || self.file_name.trim().is_empty() {
            return Err(ConfigError::EmptyPath);
        }

        let interval = match self.raw_interval {
            Some(raw) => raw.parse::<IntervalClass>()?,
            None => self.interval,
        };

        let base_path = normalize_base_path(&self.base_path);
        ensure_directory(Path::new(&base_path))?;

        let path_template = path_template(&base_path, &self.division, &self.file_name, interval);
        let max_age = self.max_age.filter(|age| !age.is_zero());

        debug!(
            template = %path_template,
            interval = %interval,
            max_age_secs = max_age.map(|a| a.as_secs()),
            "built rotation policy"
        );

        Ok(RotationPolicy {
            base_path,
            file_name: self.file_name,
            division: self.division,
            interval,
            path_template,
            max_age,
            time_zone: self.time_zone,
        })
    }
}

impl RotationPolicy {
    /// Start building a policy for `base_path` and `file_name`.
    pub fn builder(
        base_path: impl Into<String>,
        file_name: impl Into<String>,
    ) -> RotationPolicyBuilder {
        RotationPolicyBuilder::new(base_path, file_name)
    }

    /// Base directory, always ending in exactly one separator
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Base directory as a path.
    pub fn base_dir(&self) -> &Path {
        Path::new(&self.base_path)
    }

    /// Literal suffix of every rotated file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Separator between timestamp components.
    pub fn division(&self) -> &str {
        &self.division
    }

    /// Rotation interval class.
    pub const fn interval(&self) -> IntervalClass {
        self.interval
    }

    /// Template such as `/var/log/app/%Y-%m-%d-service.log`
    pub fn path_template(&self) -> &str {
        &self.path_template
    }

    /// Retention for rotated files; `None` keeps them forever.
    pub const fn max_age(&self) -> Option<StdDuration> {
        self.max_age
    }

    /// Retention as a signed duration
    ///
    /// `None` when files are kept forever, and also when `max_age` is too
    /// large to represent, which keeps files forever in practice.
    pub fn retention(&self) -> Option<Duration> {
        self.max_age.and_then(|age| Duration::from_std(age).ok())
    }

    /// Clock buckets and file names are computed in.
    pub const fn time_zone(&self) -> TimeZoneMode {
        self.time_zone
    }

    /// Start of the bucket containing `now`, as wall-clock time in the
    /// policy's time zone.
    pub fn bucket_start(&self, now: DateTime<Utc>) -> NaiveDateTime {
        self.align(self.wall_clock(now))
    }

    fn align(&self, wall: NaiveDateTime) -> NaiveDateTime {
        let wall = wall.trunc_subsecs(0);
        let since_epoch = wall.and_utc().timestamp() + PROLEPTIC_EPOCH_OFFSET_SECS;
        let into_bucket = since_epoch.rem_euclid(self.interval.seconds());
        wall - Duration::seconds(into_bucket)
    }

    /// End of the bucket starting at `bucket_start`.
    pub fn bucket_end(&self, bucket_start: NaiveDateTime) -> NaiveDateTime {
        bucket_start + self.interval.duration()
    }

    /// Current wall-clock time in the policy's time zone.
    pub fn wall_clock(&self, now: DateTime<Utc>) -> NaiveDateTime {
        match self.time_zone {
            TimeZoneMode::Utc => now.naive_utc(),
            TimeZoneMode::Local => now.with_timezone(&Local).naive_local(),
        }
    }

    /// File name (without directory) for a bucket.
    pub fn render_file_name(&self, bucket_start: &NaiveDateTime) -> String {
        let stamp = self
            .interval
            .placeholders()
            .iter()
            .map(|p| p.render(bucket_start))
            .collect::<Vec<_>>()
            .join(self.division.as_str());
        format!("{stamp}{}{}", self.division, self.file_name)
    }

    /// Full path of the file a bucket is written to.
    pub fn render(&self, bucket_start: &NaiveDateTime) -> PathBuf {
        PathBuf::from(format!(
            "{}{}",
            self.base_path,
            self.render_file_name(bucket_start)
        ))
    }

    /// Recover the bucket timestamp embedded in a file name produced by
    /// [`RotationPolicy::render_file_name`].
    ///
    /// Returns `None` for names that do not follow this policy's layout.
    pub fn parse_bucket(&self, name: &str) -> Option<NaiveDateTime> {
        let stamp = name
            .strip_suffix(self.file_name.as_str())?
            .strip_suffix(self.division.as_str())?;

        let mut rest = stamp;
        let mut values = Vec::with_capacity(5);
        for (idx, placeholder) in self.interval.placeholders().iter().enumerate() {
            if idx > 0 {
                rest = rest.strip_prefix(self.division.as_str())?;
            }
            let (digits, tail) = rest.split_at_checked(placeholder.width())?;
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            values.push(digits.parse::<u32>().ok()?);
            rest = tail;
        }
        if !rest.is_empty() {
            return None;
        }

        let year = i32::try_from(values[0]).ok()?;
        let month = values.get(1).copied().unwrap_or(1);
        let day = values.get(2).copied().unwrap_or(1);
        let hour = values.get(3).copied().unwrap_or(0);
        let minute = values.get(4).copied().unwrap_or(0);

        NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
    }

    /// Latest instant at which a bucket written to the file `name` can end
    ///
    /// A name only records the calendar period its bucket started in. Month
    /// and year buckets are nominal spans, so a bucket starting late in the
    /// named period runs well past the period's end. The answer is the end of
    /// the last bucket that starts inside the period.
    ///
    /// Returns `None` for names that do not follow this policy's layout.
    pub fn latest_bucket_end(&self, name: &str) -> Option<NaiveDateTime> {
        let period_start = self.parse_bucket(name)?;
        let period_end = match self.interval {
            IntervalClass::Year => {
                NaiveDate::from_ymd_opt(period_start.year() + 1, 1, 1)?.and_hms_opt(0, 0, 0)?
            }
            IntervalClass::Month => period_start.checked_add_months(Months::new(1))?,
            _ => period_start.checked_add_signed(self.interval.duration())?,
        };
        let last_start = self.align(period_end.checked_sub_signed(Duration::seconds(1))?);
        last_start.checked_add_signed(self.interval.duration())
    }

    /// Files in the base directory whose names follow this policy, oldest
    /// bucket first.
    pub fn rotated_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut files: Vec<(NaiveDateTime, PathBuf)> = fs::read_dir(self.base_dir())?
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                let bucket = self.parse_bucket(path.file_name()?.to_str()?)?;
                Some((bucket, path))
            })
            .collect();
        files.sort();
        Ok(files.into_iter().map(|(_, path)| path).collect())
    }
}

/// Trim trailing separators and append exactly one.
pub fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim_end_matches(['/', MAIN_SEPARATOR]);
    format!("{trimmed}{MAIN_SEPARATOR}")
}

/// Template for a class: placeholders from year down to the class itself,
/// joined by the division, followed by the division and the file name.
pub fn path_template(
    base_path: &str,
    division: &str,
    file_name: &str,
    interval: IntervalClass,
) -> String {
    let stamp = interval
        .placeholders()
        .iter()
        .map(|p| p.token())
        .collect::<Vec<_>>()
        .join(division);
    format!("{base_path}{stamp}{division}{file_name}")
}

fn ensure_directory(dir: &Path) -> ConfigResult<()> {
    if let Err(source) = fs::create_dir_all(dir) {
        if !dir.is_dir() {
            return Err(ConfigError::PathCreationFailed {
                path: dir.to_path_buf(),
                source,
            });
        }
    }

    if !dir.is_dir() {
        return Err(ConfigError::PathCreationFailed {
            path: dir.to_path_buf(),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "path exists and is not a directory"),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn base(temp_dir: &TempDir) -> String {
        temp_dir.path().join("app").to_string_lossy().into_owned()
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_build_creates_directory_and_template() {
        let temp_dir = TempDir::new().unwrap();
        let base_path = base(&temp_dir);

        let policy = RotationPolicy::builder(&base_path, "service.log")
            .interval(IntervalClass::Day)
            .build()
            .unwrap();

        assert!(Path::new(&base_path).is_dir());
        assert_eq!(policy.base_path(), format!("{base_path}/"));
        assert_eq!(
            policy.path_template(),
            format!("{base_path}/%Y-%m-%d-service.log")
        );
        assert!(policy.max_age().is_none());
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(matches!(
            RotationPolicy::builder("", "x.log").build(),
            Err(ConfigError::EmptyPath)
        ));
        assert!(matches!(
            RotationPolicy::builder("/tmp", "").build(),
            Err(ConfigError::EmptyPath)
        ));
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let result = RotationPolicy::builder(base(&temp_dir), "x.log")
            .interval_str("weekly")
            .build();

        match result {
            Err(ConfigError::InvalidInterval(s)) => assert_eq!(s, "weekly"),
            other => panic!("Expected InvalidInterval, got {other:?}"),
        }
    }

    #[test]
    fn test_base_path_is_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("not-a-dir");
        fs::write(&file_path, b"x").unwrap();

        let result = RotationPolicy::builder(file_path.to_string_lossy(), "x.log").build();
        assert!(matches!(
            result,
            Err(ConfigError::PathCreationFailed { .. })
        ));
    }

    #[test]
    fn test_existing_directory_is_fine() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_string_lossy().into_owned();

        assert!(RotationPolicy::builder(&path, "x.log").build().is_ok());
        assert!(RotationPolicy::builder(&path, "x.log").build().is_ok());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        assert_eq!(normalize_base_path("/var/log/app"), "/var/log/app/");
        assert_eq!(normalize_base_path("/var/log/app/"), "/var/log/app/");
        assert_eq!(normalize_base_path("/var/log/app///"), "/var/log/app/");
        assert_eq!(
            normalize_base_path(&normalize_base_path("/var/log/app")),
            "/var/log/app/"
        );
        assert_eq!(normalize_base_path("/"), "/");
    }

    #[test]
    fn test_templates_per_class() {
        let cases = [
            (IntervalClass::Year, "/l/%Y-f.log"),
            (IntervalClass::Month, "/l/%Y-%m-f.log"),
            (IntervalClass::Day, "/l/%Y-%m-%d-f.log"),
            (IntervalClass::Hour, "/l/%Y-%m-%d-%H-f.log"),
            (IntervalClass::Minute, "/l/%Y-%m-%d-%H-%M-f.log"),
        ];
        for (class, expected) in cases {
            assert_eq!(path_template("/l/", "-", "f.log", class), expected);
        }
        assert_eq!(
            path_template("/l/", "_", "f.log", IntervalClass::Hour),
            "/l/%Y_%m_%d_%H_f.log"
        );
    }

    #[test]
    fn test_bucket_start_aligns_to_calendar_for_small_classes() {
        let temp_dir = TempDir::new().unwrap();
        let now = at(2024, 3, 5, 10, 37, 12);

        let day = RotationPolicy::builder(base(&temp_dir), "x.log")
            .interval(IntervalClass::Day)
            .build()
            .unwrap();
        assert_eq!(day.bucket_start(now), at(2024, 3, 5, 0, 0, 0).naive_utc());

        let hour = RotationPolicy::builder(base(&temp_dir), "x.log")
            .interval(IntervalClass::Hour)
            .build()
            .unwrap();
        assert_eq!(hour.bucket_start(now), at(2024, 3, 5, 10, 0, 0).naive_utc());

        let minute = RotationPolicy::builder(base(&temp_dir), "x.log")
            .interval(IntervalClass::Minute)
            .build()
            .unwrap();
        assert_eq!(minute.bucket_start(now), at(2024, 3, 5, 10, 37, 0).naive_utc());
    }

    #[test]
    fn test_month_bucket_is_thirty_day_span() {
        let temp_dir = TempDir::new().unwrap();
        let policy = RotationPolicy::builder(base(&temp_dir), "x.log")
            .interval(IntervalClass::Month)
            .build()
            .unwrap();

        let start = policy.bucket_start(at(2024, 3, 5, 10, 0, 0));
        let end = policy.bucket_end(start);
        assert_eq!(end - start, Duration::days(30));
        assert!(start <= at(2024, 3, 5, 10, 0, 0).naive_utc());
        assert!(end > at(2024, 3, 5, 10, 0, 0).naive_utc());

        let since_epoch = start.and_utc().timestamp() + PROLEPTIC_EPOCH_OFFSET_SECS;
        assert_eq!(since_epoch % IntervalClass::Month.seconds(), 0);
    }

    #[test]
    fn test_render_and_parse_bucket() {
        let temp_dir = TempDir::new().unwrap();
        let policy = RotationPolicy::builder(base(&temp_dir), "service.log")
            .interval(IntervalClass::Hour)
            .division("_")
            .build()
            .unwrap();

        let bucket = policy.bucket_start(at(2024, 3, 5, 10, 15, 0));
        let name = policy.render_file_name(&bucket);
        assert_eq!(name, "2024_03_05_10_service.log");
        assert_eq!(policy.parse_bucket(&name), Some(bucket));
        assert_eq!(
            policy.render(&bucket),
            PathBuf::from(format!("{}2024_03_05_10_service.log", policy.base_path()))
        );
    }

    #[test]
    fn test_parse_bucket_rejects_foreign_names() {
        let temp_dir = TempDir::new().unwrap();
        let policy = RotationPolicy::builder(base(&temp_dir), "service.log")
            .interval(IntervalClass::Day)
            .build()
            .unwrap();

        assert_eq!(policy.parse_bucket("service.log"), None);
        assert_eq!(policy.parse_bucket("2024-03-service.log"), None);
        assert_eq!(policy.parse_bucket("2024-03-05-10-service.log"), None);
        assert_eq!(policy.parse_bucket("2024-13-05-service.log"), None);
        assert_eq!(policy.parse_bucket("abcd-03-05-service.log"), None);
        assert_eq!(policy.parse_bucket("2024-03-05-other.log"), None);
        assert!(policy.parse_bucket("2024-03-05-service.log").is_some());
    }

    #[test]
    fn test_latest_bucket_end_for_calendar_aligned_classes() {
        let temp_dir = TempDir::new().unwrap();
        let policy = RotationPolicy::builder(base(&temp_dir), "x.log")
            .interval(IntervalClass::Day)
            .build()
            .unwrap();

        assert_eq!(
            policy.latest_bucket_end("2024-03-05-x.log"),
            Some(at(2024, 3, 6, 0, 0, 0).naive_utc())
        );
        assert_eq!(policy.latest_bucket_end("notes.txt"), None);
    }

    #[test]
    fn test_latest_bucket_end_covers_late_month_bucket() {
        let temp_dir = TempDir::new().unwrap();
        let policy = RotationPolicy::builder(base(&temp_dir), "x.log")
            .interval(IntervalClass::Month)
            .build()
            .unwrap();

        // The bucket holding 2024-02-20 starts in February and is named
        // after it, but ends in March.
        let start = policy.bucket_start(at(2024, 2, 20, 0, 0, 0));
        assert_eq!(policy.render_file_name(&start), "2024-02-x.log");
        let end = policy.bucket_end(start);
        assert!(end > at(2024, 3, 1, 0, 0, 0).naive_utc());

        let latest = policy.latest_bucket_end("2024-02-x.log").unwrap();
        assert!(latest >= end);
        assert!(latest - end < IntervalClass::Month.duration());
    }

    #[test]
    fn test_latest_bucket_end_covers_every_year_bucket() {
        let temp_dir = TempDir::new().unwrap();
        let policy = RotationPolicy::builder(base(&temp_dir), "x.log")
            .interval(IntervalClass::Year)
            .build()
            .unwrap();

        let latest = policy.latest_bucket_end("2023-x.log").unwrap();
        for month in 1..=12 {
            let start = policy.bucket_start(at(2023, month, 15, 0, 0, 0));
            if policy.render_file_name(&start) == "2023-x.log" {
                assert!(policy.bucket_end(start) <= latest);
            }
        }
    }

    #[test]
    fn test_zero_max_age_means_forever() {
        let temp_dir = TempDir::new().unwrap();
        let policy = RotationPolicy::builder(base(&temp_dir), "x.log")
            .max_age(Some(StdDuration::ZERO))
            .build()
            .unwrap();
        assert!(policy.max_age().is_none());
        assert!(policy.retention().is_none());
    }
}
