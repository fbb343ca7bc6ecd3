use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlanYaml {
    pub base_url: String,

    /// Pre-flight probe path; omit to skip the probe.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub health_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub seed: Option<u64>,

    /// Delay between a virtual user's requests.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pacing: Option<YamlDuration>,

    /// Pause between consecutive phases.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub phase_pause: Option<YamlDuration>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timeouts: Option<TimeoutsYaml>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub health_timeouts: Option<TimeoutsYaml>,

    pub scenarios: Vec<ScenarioYaml>,
    pub phases: Vec<PhaseYaml>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TimeoutsYaml {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub connect: Option<YamlDuration>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total: Option<YamlDuration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScenarioYaml {
    pub name: String,

    /// HTTP method; defaults to GET.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub method: Option<String>,

    /// Path resolved against `baseUrl`, or an absolute http(s) URL.
    pub target: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub headers: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub body: Option<String>,

    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PhaseYaml {
    pub name: String,
    pub users: u32,
    pub duration: YamlDuration,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct YamlDuration(Duration);

impl YamlDuration {
    fn into_inner(self) -> Duration {
        self.0
    }
}

impl From<Duration> for YamlDuration {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl Serialize for YamlDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(self.0).to_string())
    }
}

impl<'de> Deserialize<'de> for YamlDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl<'de> serde::de::Visitor<'de> for V {
            type Value = YamlDuration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 10s), integer seconds, or float seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(YamlDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v <= 0 {
                    return Err(E::custom("duration must be positive"));
                }
                Ok(YamlDuration(Duration::from_secs(v as u64)))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if !v.is_finite() || v <= 0.0 {
                    return Err(E::custom("duration must be a positive, finite number"));
                }
                Ok(YamlDuration(Duration::from_secs_f64(v)))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let d = humantime::parse_duration(v).map_err(E::custom)?;
                Ok(YamlDuration(d))
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                self.visit_str(&v)
            }
        }

        deserializer.deserialize_any(V)
    }
}

pub async fn load_plan_from_yaml(path: &Path) -> anyhow::Result<rampr_core::LoadPlan> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read plan: {}", path.display()))?;

    let doc: PlanYaml = serde_yaml::from_slice(&bytes)
        .with_context(|| format!("failed to parse YAML: {}", path.display()))?;

    plan_from_doc(doc)
}

fn plan_from_doc(doc: PlanYaml) -> anyhow::Result<rampr_core::LoadPlan> {
    let scenarios = doc
        .scenarios
        .into_iter()
        .map(scenario_from_yaml)
        .collect::<anyhow::Result<Vec<_>>>()?;

    let catalog = rampr_core::ScenarioCatalog::new(scenarios).context("invalid scenarios")?;

    let phases = doc
        .phases
        .into_iter()
        .map(|p| rampr_core::PhaseSpec::new(&p.name, p.users, p.duration.into_inner()))
        .collect();

    let mut plan =
        rampr_core::LoadPlan::new(&doc.base_url, catalog, phases).context("invalid plan")?;

    if let Some(d) = doc.pacing {
        plan = plan.with_pacing(d.into_inner());
    }
    if let Some(d) = doc.phase_pause {
        plan = plan.with_phase_pause(d.into_inner());
    }
    if let Some(t) = doc.timeouts {
        plan = plan.with_timeouts(merge_timeouts(rampr_core::RequestTimeouts::load_default(), &t));
    }
    if let Some(t) = doc.health_timeouts {
        plan = plan.with_health_timeouts(merge_timeouts(
            rampr_core::RequestTimeouts::health_default(),
            &t,
        ));
    }
    if let Some(path) = &doc.health_path {
        plan = plan.with_health_path(path);
    }
    if let Some(seed) = doc.seed {
        plan = plan.with_seed(seed);
    }

    Ok(plan)
}

fn merge_timeouts(
    mut base: rampr_core::RequestTimeouts,
    yaml: &TimeoutsYaml,
) -> rampr_core::RequestTimeouts {
    if let Some(c) = yaml.connect {
        base.connect = c.into_inner();
    }
    if let Some(t) = yaml.total {
        base.total = t.into_inner();
    }
    base
}

fn scenario_from_yaml(y: ScenarioYaml) -> anyhow::Result<rampr_core::Scenario> {
    let method = y.method.as_deref().unwrap_or("GET");
    let mut s = rampr_core::Scenario::request(&y.name, method, &y.target)
        .with_context(|| format!("scenario `{}`", y.name))?
        .weight(y.weight);

    for (k, v) in &y.headers {
        s = s.header(k, v);
    }
    if let Some(body) = &y.body {
        s = s.body_str(body);
    }

    Ok(s)
}

/// Render a plan back into its YAML document, for `init` scaffolding.
pub(crate) fn doc_from_plan(plan: &rampr_core::LoadPlan) -> PlanYaml {
    let scenarios = plan
        .catalog
        .scenarios()
        .iter()
        .map(|s| ScenarioYaml {
            name: s.name.to_string(),
            method: (s.method != http_get()).then(|| s.method.to_string()),
            target: s.target.clone(),
            headers: s.headers.iter().cloned().collect(),
            body: s
                .body
                .as_ref()
                .map(|b| String::from_utf8_lossy(b).into_owned()),
            weight: s.weight,
        })
        .collect();

    let phases = plan
        .phases
        .iter()
        .map(|p| PhaseYaml {
            name: p.name.to_string(),
            users: p.concurrency,
            duration: YamlDuration::from(p.duration),
        })
        .collect();

    PlanYaml {
        base_url: plan.base_url.to_string(),
        health_path: plan.health_path.clone(),
        seed: plan.seed,
        pacing: Some(YamlDuration::from(plan.pacing)),
        phase_pause: Some(YamlDuration::from(plan.phase_pause)),
        timeouts: Some(TimeoutsYaml {
            connect: Some(YamlDuration::from(plan.timeouts.connect)),
            total: Some(YamlDuration::from(plan.timeouts.total)),
        }),
        health_timeouts: None,
        scenarios,
        phases,
    }
}

fn http_get() -> rampr_core::Method {
    rampr_core::Method::GET
}

pub(crate) async fn write_yaml_file<T: Serialize>(path: &Path, doc: &T) -> anyhow::Result<()> {
    let s = serde_yaml::to_string(doc).context("failed to serialize YAML")?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    tokio::fs::write(path, s)
        .await
        .with_context(|| format!("failed to write file: {}", path.display()))?;

    Ok(())
}
